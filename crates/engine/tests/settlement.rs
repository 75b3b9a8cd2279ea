use chrono::{DateTime, TimeZone, Utc};
use sea_orm::{Database, DatabaseConnection};

use engine::{
    Engine, EngineError, MoneyCents, Participant, ParticipantStore, SplitExpense, SplitGroup,
    SplitGroupStore, settlement::Transfer,
};
use migration::MigratorTrait;
use uuid::Uuid;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, d, 20, 0, 0).unwrap()
}

async fn roster(engine: &Engine, names: &[&str]) -> Vec<Participant> {
    let mut participants = Vec::new();
    for name in names {
        participants.push(engine.create_participant(name).await.unwrap());
    }
    participants
}

async fn add(
    engine: &Engine,
    group: &SplitGroup,
    cents: i64,
    paid_by: &Participant,
    among: &[&Participant],
) -> SplitExpense {
    let expense = SplitExpense::new(
        group.id,
        "Dinner".to_string(),
        MoneyCents::new(cents),
        "Food".to_string(),
        paid_by.id,
        among.iter().map(|p| p.id).collect(),
        group.date,
    )
    .unwrap();
    engine.add_split_expense(expense).await.unwrap()
}

#[tokio::test]
async fn one_payer_is_paid_back_by_everyone() {
    let (engine, _db) = engine_with_db().await;
    let people = roster(&engine, &["Ann", "Bob", "Cid"]).await;
    let (ann, bob, cid) = (&people[0], &people[1], &people[2]);
    let trip = engine.create_group("Lisbon", day(1)).await.unwrap();

    add(&engine, &trip, 9_000, ann, &[ann, bob, cid]).await;

    let settlement = engine.settle_group(Some(trip.id)).await.unwrap();
    assert_eq!(
        settlement.transfers,
        vec![
            Transfer {
                from: bob.id,
                to: ann.id,
                amount: MoneyCents::new(3_000),
            },
            Transfer {
                from: cid.id,
                to: ann.id,
                amount: MoneyCents::new(3_000),
            },
        ]
    );
    let nets: Vec<f64> = settlement.balances.iter().map(|b| b.net).collect();
    assert_eq!(nets, vec![6_000.0, -3_000.0, -3_000.0]);
    assert_eq!(settlement.summaries[0].paid, MoneyCents::new(9_000));
}

#[tokio::test]
async fn mutual_expenses_cancel_out() {
    let (engine, _db) = engine_with_db().await;
    let people = roster(&engine, &["Ann", "Bob"]).await;
    let (ann, bob) = (&people[0], &people[1]);
    let trip = engine.create_group("Lisbon", day(1)).await.unwrap();

    add(&engine, &trip, 10_000, ann, &[ann, bob]).await;
    add(&engine, &trip, 10_000, bob, &[ann, bob]).await;

    let settlement = engine.settle_group(Some(trip.id)).await.unwrap();
    assert!(settlement.transfers.is_empty());
}

#[tokio::test]
async fn settling_one_group_ignores_the_others() {
    let (engine, _db) = engine_with_db().await;
    let people = roster(&engine, &["Ann", "Bob"]).await;
    let (ann, bob) = (&people[0], &people[1]);
    let first = engine.create_group("Day 1", day(1)).await.unwrap();
    let second = engine.create_group("Day 2", day(2)).await.unwrap();

    add(&engine, &first, 4_000, ann, &[ann, bob]).await;
    add(&engine, &second, 1_000, bob, &[ann, bob]).await;

    let day_one = engine.settle_group(Some(first.id)).await.unwrap();
    assert_eq!(day_one.transfers.len(), 1);
    assert_eq!(day_one.transfers[0].amount, MoneyCents::new(2_000));

    let overall = engine.settle_group(None).await.unwrap();
    assert_eq!(
        overall.transfers,
        vec![Transfer {
            from: bob.id,
            to: ann.id,
            amount: MoneyCents::new(1_500),
        }]
    );

    assert_eq!(engine.group_expenses(second.id).await.unwrap().len(), 1);
    assert_eq!(engine.all_split_expenses().await.unwrap().len(), 2);
}

#[tokio::test]
async fn members_keep_their_order() {
    let (engine, _db) = engine_with_db().await;
    let people = roster(&engine, &["Ann", "Bob", "Cid"]).await;
    let (ann, bob, cid) = (&people[0], &people[1], &people[2]);
    let trip = engine.create_group("Lisbon", day(1)).await.unwrap();

    let stored = add(&engine, &trip, 3_000, bob, &[cid, ann]).await;
    let loaded = engine.group_expenses(trip.id).await.unwrap();
    assert_eq!(loaded, vec![stored]);
    assert_eq!(loaded[0].split_among, vec![cid.id, ann.id]);

    let listed: Vec<String> = engine
        .list_participants()
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(listed, vec!["Ann", "Bob", "Cid"]);
}

#[tokio::test]
async fn unknown_participants_are_rejected() {
    let (engine, _db) = engine_with_db().await;
    let people = roster(&engine, &["Ann"]).await;
    let trip = engine.create_group("Lisbon", day(1)).await.unwrap();
    let stranger = Uuid::new_v4();

    let expense = SplitExpense::new(
        trip.id,
        "Taxi".to_string(),
        MoneyCents::new(2_000),
        "Transport".to_string(),
        people[0].id,
        vec![people[0].id, stranger],
        trip.date,
    )
    .unwrap();
    let err = engine.add_split_expense(expense).await.unwrap_err();
    assert!(matches!(err, EngineError::UnknownParticipant(id) if id == stranger.to_string()));
    assert!(engine.all_split_expenses().await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_group_is_not_found() {
    let (engine, _db) = engine_with_db().await;

    let err = engine.settle_group(Some(Uuid::new_v4())).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn referenced_participants_cannot_be_removed() {
    let (engine, _db) = engine_with_db().await;
    let people = roster(&engine, &["Ann", "Bob", "Cid"]).await;
    let (ann, bob, cid) = (&people[0], &people[1], &people[2]);
    let trip = engine.create_group("Lisbon", day(1)).await.unwrap();

    let dinner = add(&engine, &trip, 2_000, ann, &[ann, bob]).await;

    // Bob only shares the expense; that is still a reference.
    let err = engine.remove_participant(bob.id).await.unwrap_err();
    assert!(matches!(err, EngineError::ParticipantInUse(name) if name == "Bob"));

    engine.remove_participant(cid.id).await.unwrap();
    engine.delete_split_expense(dinner.id).await.unwrap();
    engine.remove_participant(bob.id).await.unwrap();

    let left = engine.list_participants().await.unwrap();
    assert_eq!(left, vec![ann.clone()]);

    assert!(matches!(
        engine.remove_participant(bob.id).await.unwrap_err(),
        EngineError::KeyNotFound(_)
    ));
}

#[tokio::test]
async fn participant_names_are_unique() {
    let (engine, _db) = engine_with_db().await;
    roster(&engine, &["Ann"]).await;

    let err = engine.create_participant(" ann ").await.unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));
    assert!(matches!(
        engine.create_participant("  ").await.unwrap_err(),
        EngineError::InvalidName(_)
    ));
}
