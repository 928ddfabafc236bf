//! Fill the database with a year of demo expenses for `seed@example.com`.
//!
//! Existing users, categories and expenses are wiped first.
use std::ops::RangeInclusive;

use anyhow::Context;
use rand::Rng;
use sqlx::SqlitePool;
use time::{Date, Month, OffsetDateTime, Time};
use tracing::info;

use spendlog::{
    auth::{password::hash_password, repo_types::User},
    categories::dto::Category,
    config::DEFAULT_DATABASE_URL,
    db,
    expenses::{dto::NewExpense, repo},
};

const SEED_EMAIL: &str = "seed@example.com";
const SEED_PASSWORD: &str = "111111Aa";

/// Per category: how many expenses per month and the price range of each.
const MONTHLY_PLAN: [(&str, RangeInclusive<u32>, RangeInclusive<i64>); 5] = [
    ("Rent", 1..=1, 1800..=2400),
    ("Food", 8..=12, 20..=120),
    ("Transport", 3..=5, 50..=200),
    ("Entertainment", 2..=4, 50..=400),
    ("Health", 0..=2, 50..=300),
];

struct PlannedExpense {
    category: &'static str,
    price: i64,
    created_at: OffsetDateTime,
}

fn random_instant_in_month(rng: &mut impl Rng, year: i32, month: Month) -> anyhow::Result<OffsetDateTime> {
    let days = time::util::days_in_year_month(year, month);
    let day = Date::from_calendar_date(year, month, rng.gen_range(1..=days))?;
    let at = Time::from_hms(rng.gen_range(0..=23), rng.gen_range(0..=59), 0)?;
    Ok(day.with_time(at).assume_utc())
}

fn plan_year(rng: &mut impl Rng, year: i32) -> anyhow::Result<Vec<PlannedExpense>> {
    let mut planned = Vec::new();
    for month_number in 1..=12u8 {
        let month = Month::try_from(month_number)?;
        for (category, count, prices) in MONTHLY_PLAN {
            for _ in 0..rng.gen_range(count) {
                planned.push(PlannedExpense {
                    category,
                    price: rng.gen_range(prices.clone()),
                    created_at: random_instant_in_month(rng, year, month)?,
                });
            }
        }
    }
    Ok(planned)
}

async fn wipe(db: &SqlitePool) -> anyhow::Result<()> {
    let mut tx = db.begin().await?;
    for table in ["expenses", "categories", "users"] {
        sqlx::query(&format!("DELETE FROM {table}"))
            .execute(&mut *tx)
            .await
            .with_context(|| format!("wipe {table}"))?;
    }
    tx.commit().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "seed=info,spendlog=info".into()),
        )
        .init();

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.into());
    let pool = db::connect_url(&database_url, 1).await?;
    db::migrate(&pool).await?;

    wipe(&pool).await?;

    let user = User::create(&pool, SEED_EMAIL, &hash_password(SEED_PASSWORD)?).await?;
    let mut categories = Vec::new();
    for (name, _, _) in MONTHLY_PLAN {
        categories.push(Category::create(&pool, name).await?);
    }

    let year = OffsetDateTime::now_utc().year() - 1;
    let planned = plan_year(&mut rand::thread_rng(), year)?;
    for expense in &planned {
        let category = categories
            .iter()
            .find(|c| c.name == expense.category)
            .context("seed category missing")?;
        let new = NewExpense {
            name: expense.category.to_owned(),
            category_id: category.id,
            price: expense.price,
            created_at: Some(expense.created_at),
        };
        repo::create(&pool, user.id, &new).await?;
    }

    info!(year, expenses = planned.len(), email = SEED_EMAIL, "seed completed");
    Ok(())
}
