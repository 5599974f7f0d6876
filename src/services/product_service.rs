use crate::entities::product_entity as products;
use crate::error::{AppError, AppResult};
use crate::models::*;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};

#[derive(Clone)]
pub struct ProductService {
    pool: DatabaseConnection,
}

fn validate_name(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::ValidationError(format!("{field} cannot be empty")));
    }
    if value.chars().count() > 255 {
        return Err(AppError::ValidationError(format!("{field} is too long")));
    }
    Ok(())
}

fn validate_amount(field: &str, value: i64) -> AppResult<()> {
    if value < 0 {
        return Err(AppError::ValidationError(format!(
            "{field} cannot be negative"
        )));
    }
    Ok(())
}

impl ProductService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    async fn find_model(&self, id: i64) -> AppResult<products::Model> {
        products::Entity::find_by_id(id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product {id} not found")))
    }

    pub async fn get_product(&self, id: i64) -> AppResult<ProductResponse> {
        Ok(self.find_model(id).await?.into())
    }

    pub async fn list_products(&self, query: &ProductQuery) -> AppResult<Vec<ProductResponse>> {
        let mut select = products::Entity::find();
        if let Some(category) = query.category.as_deref().filter(|c| !c.trim().is_empty()) {
            select = select.filter(products::Column::Category.eq(category.trim()));
        }
        let rows = select
            .order_by_asc(products::Column::Category)
            .order_by_asc(products::Column::Name)
            .all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(ProductResponse::from).collect())
    }

    /// 菜单：按分类分组，分类与组内商品均按名称排序
    pub async fn menu(&self) -> AppResult<Vec<MenuCategory>> {
        let rows = self.list_products(&ProductQuery::default()).await?;
        let mut menu: Vec<MenuCategory> = Vec::new();
        for product in rows {
            match menu.last_mut() {
                Some(group) if group.category == product.category => group.products.push(product),
                _ => menu.push(MenuCategory {
                    category: product.category.clone(),
                    products: vec![product],
                }),
            }
        }
        Ok(menu)
    }

    pub async fn create_product(&self, request: CreateProductRequest) -> AppResult<ProductResponse> {
        validate_name("name", &request.name)?;
        validate_name("category", &request.category)?;
        validate_amount("price", request.price)?;
        validate_amount("stock", request.stock)?;

        let now = Utc::now();
        let product = products::ActiveModel {
            name: Set(request.name.trim().to_string()),
            price: Set(request.price),
            stock: Set(request.stock),
            category: Set(request.category.trim().to_string()),
            image_url: Set(request.image_url),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        log::info!("Product created: {} ({})", product.name, product.id);
        Ok(product.into())
    }

    pub async fn update_product(
        &self,
        id: i64,
        request: UpdateProductRequest,
    ) -> AppResult<ProductResponse> {
        let mut am = self.find_model(id).await?.into_active_model();

        if let Some(name) = request.name {
            validate_name("name", &name)?;
            am.name = Set(name.trim().to_string());
        }
        if let Some(category) = request.category {
            validate_name("category", &category)?;
            am.category = Set(category.trim().to_string());
        }
        if let Some(price) = request.price {
            validate_amount("price", price)?;
            am.price = Set(price);
        }
        if let Some(stock) = request.stock {
            validate_amount("stock", stock)?;
            am.stock = Set(stock);
        }
        if let Some(image_url) = request.image_url {
            am.image_url = Set(Some(image_url).filter(|u| !u.trim().is_empty()));
        }
        am.updated_at = Set(Utc::now());

        let product = am.update(&self.pool).await?;
        Ok(product.into())
    }

    /// 已下单的明细保留快照，删除商品不影响历史订单
    pub async fn delete_product(&self, id: i64) -> AppResult<()> {
        let result = products::Entity::delete_by_id(id).exec(&self.pool).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("Product {id} not found")));
        }
        log::info!("Product deleted: {id}");
        Ok(())
    }
}
