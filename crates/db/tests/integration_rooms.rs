//! Integration-Tests fuer RoomStore (In-Memory SQLite)

use std::time::Duration;

use chrono::Utc;
use triqui_core::{ConnectionId, Room, RoomCode};
use triqui_db::{RoomRecord, RoomStore, SqliteDb};

async fn db() -> SqliteDb {
    SqliteDb::in_memory().await.expect("In-Memory DB konnte nicht erstellt werden")
}

fn raum(code: &str) -> (Room, ConnectionId) {
    let x = ConnectionId::neu();
    (Room::erstellen(RoomCode::neu(code), x, "Ana"), x)
}

#[tokio::test]
async fn raum_speichern_und_laden() {
    let db = db().await;
    let (raum, _) = raum("AAA111");

    db.save(&RoomRecord::aus_room(&raum).unwrap()).await.unwrap();

    let geladen = db
        .find_by_code(raum.code())
        .await
        .unwrap()
        .expect("Raum fehlt")
        .into_room()
        .unwrap();
    assert_eq!(geladen.code(), raum.code());
    assert_eq!(geladen.players(), raum.players());
    assert_eq!(geladen.history(), raum.history());
    assert!(!geladen.hat_verbindungen());
}

#[tokio::test]
async fn unbekannter_raum_ist_none() {
    let db = db().await;
    let ergebnis = db.find_by_code(&RoomCode::neu("NICHTDA")).await.unwrap();
    assert!(ergebnis.is_none());
}

#[tokio::test]
async fn speichern_ueberschreibt() {
    let db = db().await;
    let (mut raum, x) = raum("BBB222");
    db.save(&RoomRecord::aus_room(&raum).unwrap()).await.unwrap();

    raum.beitreten(ConnectionId::neu(), "Beto").unwrap();
    raum.zug_ausfuehren(x, 0).unwrap();
    db.save(&RoomRecord::aus_room(&raum).unwrap()).await.unwrap();

    assert_eq!(db.count().await.unwrap(), 1);
    let geladen = db
        .find_by_code(raum.code())
        .await
        .unwrap()
        .unwrap()
        .into_room()
        .unwrap();
    assert_eq!(geladen.players().len(), 2);
    assert_eq!(geladen.history().len(), 2);
    assert_eq!(geladen.created_at(), raum.created_at());
}

#[tokio::test]
async fn abgelaufener_raum_wird_nicht_geladen() {
    let db = db().await;
    let (raum, _) = raum("CCC333");
    let mut record = RoomRecord::aus_room(&raum).unwrap();
    record.updated_at = Utc::now() - chrono::Duration::hours(25);
    db.save(&record).await.unwrap();

    assert!(db.find_by_code(raum.code()).await.unwrap().is_none());
    // Zeile existiert noch bis zum naechsten Aufraeumen
    assert_eq!(db.count().await.unwrap(), 1);
}

#[tokio::test]
async fn abgelaufene_raeume_loeschen() {
    let db = db().await;

    let (alt, _) = raum("ALT001");
    let mut record = RoomRecord::aus_room(&alt).unwrap();
    record.updated_at = Utc::now() - chrono::Duration::hours(30);
    db.save(&record).await.unwrap();

    let (frisch, _) = raum("NEU001");
    db.save(&RoomRecord::aus_room(&frisch).unwrap()).await.unwrap();

    let grenze = Utc::now() - chrono::Duration::hours(24);
    let geloescht = db.delete_expired(grenze).await.unwrap();

    assert_eq!(geloescht, 1);
    assert_eq!(db.count().await.unwrap(), 1);
    assert!(db.find_by_code(frisch.code()).await.unwrap().is_some());
}

#[tokio::test]
async fn kurze_ttl_laesst_raum_verfallen() {
    let db = db().await.mit_ttl(Duration::from_secs(60));
    let (raum, _) = raum("TTL001");
    let mut record = RoomRecord::aus_room(&raum).unwrap();
    record.updated_at = Utc::now() - chrono::Duration::minutes(2);
    db.save(&record).await.unwrap();

    assert!(db.find_by_code(raum.code()).await.unwrap().is_none());
}

#[tokio::test]
async fn kaputtes_dokument_meldet_fehler() {
    let db = db().await;
    sqlx::query(
        "INSERT INTO rooms (code, document, created_at, updated_at) VALUES (?, ?, ?, ?)",
    )
    .bind("KAPUTT")
    .bind("{\"code\":\"KAPUTT\"}")
    .bind(Utc::now().to_rfc3339())
    .bind(Utc::now().timestamp_millis())
    .execute(db.pool())
    .await
    .unwrap();

    let record = db
        .find_by_code(&RoomCode::neu("kaputt"))
        .await
        .unwrap()
        .unwrap();
    assert!(record.into_room().is_err());
}
