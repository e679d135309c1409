//! Проверки реестра на настоящем PostgreSQL.
//!
//! `DATABASE_URL=postgres://... cargo test --test postgres_ledger -- --ignored`

use futures::future::join_all;
use std::sync::Arc;
use uuid::Uuid;

use cinema_booking::config::BookingConfig;
use cinema_booking::database::Database;
use cinema_booking::ledger::{ClaimOutcome, PgSeatLedger, SeatLedger};
use cinema_booking::models::{NewTicket, SeatStatus};

async fn ledger() -> (Database, PgSeatLedger) {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a test database");
    let pool = sqlx::PgPool::connect(&url).await.unwrap();
    let db = Database::from_pool(pool);
    db.run_migrations().await.unwrap();

    let ledger = PgSeatLedger::new(
        &db,
        &BookingConfig {
            claim_lock_timeout_ms: 5_000,
        },
    );
    (db, ledger)
}

/// Новый сеанс с уникальными идентификаторами, чтобы прогоны не мешали друг другу.
async fn schedule(db: &Database, seats: &[(&str, &str)]) -> (String, Vec<String>) {
    let showtime_id = format!("show-{}", Uuid::new_v4());
    sqlx::query(
        "INSERT INTO showtimes (id, movie_id, cinema_id, starts_at) VALUES ($1, 'movie', 'cinema', NOW())",
    )
    .bind(&showtime_id)
    .execute(&db.pool)
    .await
    .unwrap();

    let mut seat_ids = Vec::new();
    for (label, price) in seats {
        let seat_id = format!("{}-{}", label, Uuid::new_v4());
        sqlx::query("INSERT INTO seats (id, price) VALUES ($1, $2::NUMERIC)")
            .bind(&seat_id)
            .bind(*price)
            .execute(&db.pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO showtime_seats (showtime_id, seat_id) VALUES ($1, $2)")
            .bind(&showtime_id)
            .bind(&seat_id)
            .execute(&db.pool)
            .await
            .unwrap();
        seat_ids.push(seat_id);
    }
    (showtime_id, seat_ids)
}

async fn book(ledger: &PgSeatLedger, showtime_id: &str, seat_ids: &[String]) -> bool {
    let mut tx = ledger.begin().await.unwrap();
    let claimed = match tx.claim_seats(showtime_id, seat_ids).await.unwrap() {
        ClaimOutcome::Claimed(claimed) => claimed,
        ClaimOutcome::PartiallyUnavailable(_) => return false,
    };
    let tickets = claimed
        .into_iter()
        .map(|seat| NewTicket {
            owner_name: "alice".to_string(),
            seat_id: seat.seat_id,
            showtime_id: showtime_id.to_string(),
            price: seat.price,
        })
        .collect();
    tx.insert_tickets(tickets).await.unwrap();
    tx.commit().await.unwrap();
    true
}

#[tokio::test]
#[ignore = "needs PostgreSQL in DATABASE_URL"]
async fn claim_reads_exact_prices_and_commits_tickets() {
    let (db, ledger) = ledger().await;
    let (showtime_id, seats) = schedule(&db, &[("A1", "9.99"), ("A2", "0.01")]).await;

    let mut tx = ledger.begin().await.unwrap();
    let ClaimOutcome::Claimed(claimed) = tx.claim_seats(&showtime_id, &seats).await.unwrap() else {
        panic!("expected the claim to succeed");
    };
    let prices: Vec<String> = claimed.iter().map(|s| s.price.to_string()).collect();
    assert_eq!(prices, vec!["9.99", "0.01"]);
    drop(tx);

    // Откат: места снова свободны
    let availability = ledger.query_availability(&showtime_id, &seats).await.unwrap();
    assert!(availability.values().all(|available| *available));

    assert!(book(&ledger, &showtime_id, &seats).await);
    let availability = ledger.query_availability(&showtime_id, &seats).await.unwrap();
    assert!(availability.values().all(|available| !*available));

    let tickets: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tickets WHERE showtime_id = $1")
        .bind(&showtime_id)
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(tickets, 2);
}

#[tokio::test]
#[ignore = "needs PostgreSQL in DATABASE_URL"]
async fn racing_claims_on_one_seat_have_one_winner() {
    let (db, ledger) = ledger().await;
    let (showtime_id, seats) = schedule(&db, &[("A1", "10.00"), ("A2", "12.50")]).await;
    let ledger = Arc::new(ledger);
    let showtime_id = Arc::new(showtime_id);

    let attempts = (0..8).map(|i| {
        let ledger = ledger.clone();
        let showtime_id = showtime_id.clone();
        // Половина просит оба места, половина одно: пересечение по A1 у всех
        let wanted = if i % 2 == 0 {
            seats.clone()
        } else {
            vec![seats[0].clone()]
        };
        tokio::spawn(async move { book(&ledger, &showtime_id, &wanted).await })
    });

    let winners = join_all(attempts)
        .await
        .into_iter()
        .filter(|joined| *joined.as_ref().unwrap())
        .count();
    assert_eq!(winners, 1);

    // Каждому занятому месту соответствует ровно один билет
    let orphans: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM showtime_seats ss
        LEFT JOIN tickets t ON t.showtime_id = ss.showtime_id AND t.seat_id = ss.seat_id
        WHERE ss.showtime_id = $1 AND NOT ss.is_available AND t.id IS NULL
        "#,
    )
    .bind(showtime_id.as_str())
    .fetch_one(&db.pool)
    .await
    .unwrap();
    assert_eq!(orphans, 0);
}

#[tokio::test]
#[ignore = "needs PostgreSQL in DATABASE_URL"]
async fn list_seats_returns_the_whole_showtime_in_order() {
    let (db, ledger) = ledger().await;
    let (showtime_id, seats) = schedule(&db, &[("B1", "5.00"), ("A1", "7.50")]).await;

    assert!(book(&ledger, &showtime_id, &seats[..1]).await);

    let listed = ledger.list_seats(&showtime_id).await.unwrap();
    let mut expected = vec![
        SeatStatus {
            seat_id: seats[0].clone(),
            is_available: false,
        },
        SeatStatus {
            seat_id: seats[1].clone(),
            is_available: true,
        },
    ];
    expected.sort_by(|a, b| a.seat_id.cmp(&b.seat_id));
    assert_eq!(listed, expected);

    let missing = format!("show-{}", Uuid::new_v4());
    assert!(ledger.list_seats(&missing).await.unwrap().is_empty());
}
