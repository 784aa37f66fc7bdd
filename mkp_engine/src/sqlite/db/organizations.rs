use log::debug;
use sqlx::SqliteConnection;

use crate::db_types::{NewWarehouse, Organization, Warehouse};

pub async fn insert_organization(name: &str, conn: &mut SqliteConnection) -> Result<Organization, sqlx::Error> {
    let org: Organization = sqlx::query_as("INSERT INTO organizations (name) VALUES ($1) RETURNING *")
        .bind(name)
        .fetch_one(conn)
        .await?;
    debug!("🗃️ Organization #{} ({}) created", org.id, org.name);
    Ok(org)
}

pub async fn fetch_organization(id: i64, conn: &mut SqliteConnection) -> Result<Option<Organization>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM organizations WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn insert_warehouse(warehouse: NewWarehouse, conn: &mut SqliteConnection) -> Result<Warehouse, sqlx::Error> {
    let warehouse: Warehouse =
        sqlx::query_as("INSERT INTO warehouses (organization_id, name, address) VALUES ($1, $2, $3) RETURNING *")
            .bind(warehouse.organization_id)
            .bind(warehouse.name)
            .bind(warehouse.address)
            .fetch_one(conn)
            .await?;
    debug!("🗃️ Warehouse #{} created for organization #{}", warehouse.id, warehouse.organization_id);
    Ok(warehouse)
}

pub async fn fetch_warehouse(id: i64, conn: &mut SqliteConnection) -> Result<Option<Warehouse>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM warehouses WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn warehouses_for_organization(
    organization_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Warehouse>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM warehouses WHERE organization_id = $1 ORDER BY id")
        .bind(organization_id)
        .fetch_all(conn)
        .await
}
