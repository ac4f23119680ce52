// src/application/services/products.rs
use crate::application::{
    dto::{ProductDto, ProductPayload},
    error::{ApplicationError, ApplicationResult},
};
use crate::domain::product::Product;
use crate::infrastructure::persistence::ScopedPersistenceContext;
use tokio_util::sync::CancellationToken;

/// CRUD over products for the tenant a context is bound to. Every save runs
/// under a child of the service's cancellation token.
#[derive(Clone, Default)]
pub struct ProductService {
    shutdown: CancellationToken,
}

impl ProductService {
    pub fn new(shutdown: CancellationToken) -> Self {
        Self { shutdown }
    }

    pub async fn list(&self, ctx: &mut ScopedPersistenceContext) -> ApplicationResult<Vec<ProductDto>> {
        let products = ctx.set::<Product>().list().await?;
        Ok(products.into_iter().map(ProductDto::from).collect())
    }

    pub async fn get(&self, ctx: &mut ScopedPersistenceContext, id: i64) -> ApplicationResult<ProductDto> {
        ctx.set::<Product>()
            .find(id)
            .await?
            .map(ProductDto::from)
            .ok_or_else(|| not_found(id))
    }

    pub async fn create(
        &self,
        ctx: &mut ScopedPersistenceContext,
        payload: ProductPayload,
    ) -> ApplicationResult<ProductDto> {
        let id = match payload.id {
            Some(id) => id,
            None => ctx.set::<Product>().next_key().await?,
        };
        let product = payload.into_product(id)?;
        ctx.set::<Product>().add(product)?;
        self.save(ctx).await?;
        tracing::info!(product = id, tenant = ctx.tenant().audit_label(), "product created");
        self.get(ctx, id).await
    }

    /// The path id wins; a payload carrying a different id is rejected before
    /// any storage access.
    pub async fn update(
        &self,
        ctx: &mut ScopedPersistenceContext,
        id: i64,
        payload: ProductPayload,
    ) -> ApplicationResult<ProductDto> {
        Self::ensure_matching_id(id, &payload)?;
        let product = payload.into_product(id)?;
        ctx.set::<Product>().update(product).await?;
        self.save(ctx).await?;
        self.get(ctx, id).await
    }

    pub fn ensure_matching_id(id: i64, payload: &ProductPayload) -> ApplicationResult<()> {
        match payload.id {
            Some(body_id) if body_id != id => Err(ApplicationError::validation(format!(
                "path id {id} does not match payload id {body_id}"
            ))),
            _ => Ok(()),
        }
    }

    pub async fn delete(&self, ctx: &mut ScopedPersistenceContext, id: i64) -> ApplicationResult<()> {
        if !ctx.set::<Product>().remove(id).await? {
            return Err(not_found(id));
        }
        self.save(ctx).await?;
        tracing::info!(product = id, tenant = ctx.tenant().audit_label(), "product deleted");
        Ok(())
    }

    async fn save(&self, ctx: &mut ScopedPersistenceContext) -> ApplicationResult<u64> {
        let cancel = self.shutdown.child_token();
        match ctx.save(&cancel).await {
            Ok(affected) => Ok(affected),
            Err(err) => {
                // Leave the context clean for whatever the caller does next.
                ctx.reject_changes();
                Err(err.into())
            }
        }
    }
}

fn not_found(id: i64) -> ApplicationError {
    ApplicationError::not_found(format!("product {id}"))
}
