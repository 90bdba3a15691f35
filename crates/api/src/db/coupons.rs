//! Database operations for coupons.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use bazaar_core::{CategoryId, CouponId, ProductId, UserId};

use super::RepositoryError;
use crate::models::coupon::Coupon;

/// Internal row type for coupon queries.
#[derive(Debug, sqlx::FromRow)]
struct CouponRow {
    id: i32,
    code: String,
    method: String,
    discount_type: String,
    value: Decimal,
    applies_to: String,
    applicable_product_ids: Vec<i32>,
    applicable_category_ids: Vec<i32>,
    eligibility: String,
    eligible_user_ids: Vec<i32>,
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
    active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<CouponRow> for Coupon {
    type Error = RepositoryError;

    fn try_from(row: CouponRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: CouponId::new(row.id),
            code: row.code,
            method: row.method.parse()?,
            discount_type: row.discount_type.parse()?,
            value: row.value,
            applies_to: row.applies_to.parse()?,
            applicable_product_ids: row
                .applicable_product_ids
                .into_iter()
                .map(ProductId::new)
                .collect(),
            applicable_category_ids: row
                .applicable_category_ids
                .into_iter()
                .map(CategoryId::new)
                .collect(),
            eligibility: row.eligibility.parse()?,
            eligible_user_ids: row.eligible_user_ids.into_iter().map(UserId::new).collect(),
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            active: row.active,
            created_at: row.created_at,
        })
    }
}

const COUPON_COLUMNS: &str = r"
    id, code, method, discount_type, value, applies_to,
    applicable_product_ids, applicable_category_ids,
    eligibility, eligible_user_ids, starts_at, ends_at, active, created_at
";

/// Repository for coupon database operations.
pub struct CouponRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CouponRepository<'a> {
    /// Create a new coupon repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Look up an active coupon by code.
    ///
    /// Inactive coupons are invisible here; date-window and eligibility
    /// checks are the resolver's job.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_active_by_code(
        &self,
        code: &str,
    ) -> Result<Option<Coupon>, RepositoryError> {
        let row = sqlx::query_as::<_, CouponRow>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons WHERE code = $1 AND active"
        ))
        .bind(code)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a coupon by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CouponId) -> Result<Option<Coupon>, RepositoryError> {
        let row = sqlx::query_as::<_, CouponRow>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }
}
