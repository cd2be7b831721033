use crate::error::AppResult;
use rand::Rng;
use sqlx::PgPool;

const CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate an 8-character alphanumeric promo code.
pub fn generate_promo_code() -> String {
    let mut rng = rand::thread_rng();
    (0..8)
        .map(|_| CODE_CHARS[rng.gen_range(0..CODE_CHARS.len())] as char)
        .collect()
}

/// Generate a promo code that does not collide with an existing row.
pub async fn generate_unique_promo_code(pool: &PgPool) -> AppResult<String> {
    loop {
        let code = generate_promo_code();

        let exists: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM promo_codes WHERE code = $1")
                .bind(&code)
                .fetch_one(pool)
                .await?;

        if exists == 0 {
            return Ok(code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_promo_code() {
        let code = generate_promo_code();
        assert_eq!(code.len(), 8);
        assert!(code.bytes().all(|b| CODE_CHARS.contains(&b)));
    }
}
