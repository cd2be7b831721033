use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

pub const PROMO_KIND_PERCENT: &str = "percent";
pub const PROMO_KIND_FIXED: &str = "fixed";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PromoCode {
    pub id: i64,
    pub code: String,
    /// "percent" or "fixed".
    pub kind: String,
    /// Percent points for "percent", cents for "fixed".
    pub value: i64,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_uses: Option<i32>,
    pub used_count: i32,
    pub created_at: DateTime<Utc>,
}

impl PromoCode {
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        if !self.is_active {
            return false;
        }
        if let Some(expires_at) = self.expires_at
            && expires_at <= now
        {
            return false;
        }
        if let Some(max_uses) = self.max_uses
            && self.used_count >= max_uses
        {
            return false;
        }
        true
    }

    /// Discount in cents for a given subtotal, clamped to the subtotal.
    pub fn discount_for(&self, subtotal_cents: i64) -> i64 {
        let raw = match self.kind.as_str() {
            PROMO_KIND_PERCENT => subtotal_cents * self.value.clamp(0, 100) / 100,
            PROMO_KIND_FIXED => self.value.max(0),
            _ => 0,
        };
        raw.min(subtotal_cents)
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PromoCodeResponse {
    pub code: String,
    pub kind: String,
    pub value: i64,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<PromoCode> for PromoCodeResponse {
    fn from(p: PromoCode) -> Self {
        Self {
            code: p.code,
            kind: p.kind,
            value: p.value,
            expires_at: p.expires_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn promo(kind: &str, value: i64) -> PromoCode {
        PromoCode {
            id: 1,
            code: "SAVE10".to_string(),
            kind: kind.to_string(),
            value,
            is_active: true,
            expires_at: None,
            max_uses: None,
            used_count: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_percent_discount() {
        assert_eq!(promo(PROMO_KIND_PERCENT, 10).discount_for(10000), 1000);
    }

    #[test]
    fn test_fixed_discount_clamped_to_subtotal() {
        assert_eq!(promo(PROMO_KIND_FIXED, 5000).discount_for(3000), 3000);
    }

    #[test]
    fn test_expired_promo_not_usable() {
        let mut p = promo(PROMO_KIND_PERCENT, 10);
        p.expires_at = Some(Utc::now() - Duration::hours(1));
        assert!(!p.is_usable(Utc::now()));
    }

    #[test]
    fn test_exhausted_promo_not_usable() {
        let mut p = promo(PROMO_KIND_PERCENT, 10);
        p.max_uses = Some(3);
        p.used_count = 3;
        assert!(!p.is_usable(Utc::now()));
    }

    #[test]
    fn test_inactive_promo_not_usable() {
        let mut p = promo(PROMO_KIND_PERCENT, 10);
        p.is_active = false;
        assert!(!p.is_usable(Utc::now()));
    }
}
