use crate::db::format_timestamp;
use crate::entities::{job_leases, prelude::*};
use anyhow::Result;
use chrono::{Duration, Utc};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, Set,
    sea_query::{Expr, OnConflict},
};
use tracing::debug;

pub struct LeaseRepository {
    conn: DatabaseConnection,
}

impl LeaseRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn try_acquire(
        &self,
        job_name: &str,
        holder: &str,
        ttl_seconds: i64,
    ) -> Result<bool> {
        let now = Utc::now();
        let expires_at = format_timestamp(now + Duration::seconds(ttl_seconds));

        let inserted = JobLeases::insert(job_leases::ActiveModel {
            job_name: Set(job_name.to_string()),
            holder: Set(holder.to_string()),
            expires_at: Set(expires_at.clone()),
        })
        .on_conflict(
            OnConflict::column(job_leases::Column::JobName)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(&self.conn)
        .await?;

        if inserted > 0 {
            debug!(job = job_name, holder, "Lease created");
            return Ok(true);
        }

        let result = JobLeases::update_many()
            .col_expr(job_leases::Column::Holder, Expr::value(holder))
            .col_expr(job_leases::Column::ExpiresAt, Expr::value(expires_at))
            .filter(job_leases::Column::JobName.eq(job_name))
            .filter(
                Condition::any()
                    .add(job_leases::Column::Holder.eq(holder))
                    .add(job_leases::Column::ExpiresAt.lt(format_timestamp(now))),
            )
            .exec(&self.conn)
            .await?;

        let acquired = result.rows_affected == 1;
        debug!(job = job_name, holder, acquired, "Lease renewal attempted");
        Ok(acquired)
    }

    pub async fn release(&self, job_name: &str, holder: &str) -> Result<()> {
        JobLeases::delete_many()
            .filter(job_leases::Column::JobName.eq(job_name))
            .filter(job_leases::Column::Holder.eq(holder))
            .exec(&self.conn)
            .await?;
        Ok(())
    }
}
