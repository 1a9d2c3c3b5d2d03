use common::LowStockMaterial;
use model::entities::{material, project_material};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use tracing::{debug, instrument, warn};

use crate::error::Result;

/// Finds the stock lines of a project that sit below their minimum.
#[derive(Debug, Default)]
pub struct LowStockComputer;

impl LowStockComputer {
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip(self, db))]
    pub async fn compute(
        &self,
        db: &DatabaseConnection,
        project_id: i32,
    ) -> Result<Vec<LowStockMaterial>> {
        let stock = project_material::Entity::find()
            .filter(project_material::Column::ProjectId.eq(project_id))
            .order_by_asc(project_material::Column::Id)
            .find_also_related(material::Entity)
            .all(db)
            .await?;

        debug!("Checking {} stock lines of project {}", stock.len(), project_id);
        Ok(low_stock(&stock))
    }
}

/// Keeps the lines whose quantity is strictly below the minimum stock.
pub fn low_stock(
    stock: &[(project_material::Model, Option<material::Model>)],
) -> Vec<LowStockMaterial> {
    stock
        .iter()
        .filter_map(|(line, material)| {
            let shortfall = line.shortfall()?;
            let Some(material) = material else {
                warn!("Stock line {} references missing material {}", line.id, line.material_id);
                return None;
            };
            Some(LowStockMaterial {
                project_material_id: line.id,
                material_id: material.id,
                material_name: material.name.clone(),
                unit: material.unit.clone(),
                quantity: line.quantity,
                minimum_stock: line.minimum_stock,
                shortfall,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{seed_project, setup_db};
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_only_low_lines_are_reported() {
        let db = setup_db().await;
        let project_id = seed_project(&db).await;

        let low = LowStockComputer::new().compute(&db, project_id).await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].material_name, "Cemento gris");
        assert_eq!(low[0].unit, "saco");
        assert_eq!(low[0].shortfall, Decimal::new(40, 0));
    }

    #[tokio::test]
    async fn test_unknown_project_has_no_low_stock() {
        let db = setup_db().await;
        let low = LowStockComputer::new().compute(&db, 99).await.unwrap();
        assert!(low.is_empty());
    }
}
