//! Raum-Handler – Create, Join, Move, History, Restart, Disconnect
//!
//! Jeder Handler fuehrt eine Registry-Operation aus. Erfolg wird noch unter
//! dem Raum-Lock an den Raum verteilt, Fehler gehen nur an den Absender und
//! lassen den Raum unveraendert.

use triqui_core::{ConnectionId, Room, RoomCode};
use triqui_protocol::{HistoryRequest, JoinRequest, MoveRequest, ServerEvent};

use crate::dispatcher::{ausgaenge_zustellen, Ausgang};
use crate::error::GatewayError;
use crate::server_state::GatewayState;

// Allgemeine Meldungen fuer Fehler ausserhalb der Spielregeln
const FEHLER_ERSTELLEN: &str = "Error creando la sala";
const FEHLER_BEITRETEN: &str = "Error uniéndose a la sala";
const FEHLER_ZUG: &str = "Error realizando movimiento";
const FEHLER_HISTORIE: &str = "Error retrocediendo en historial";
const FEHLER_NEUSTART: &str = "Error reiniciando juego";

/// Baut die Fehlerantwort und protokolliert je nach Schwere
fn fehler_antwort(
    conn: ConnectionId,
    code: Option<&RoomCode>,
    fehler: &GatewayError,
    allgemein: &str,
) -> Vec<Ausgang> {
    let code = code.map(RoomCode::as_str).unwrap_or("-");
    match fehler {
        GatewayError::Spiel(e) => {
            tracing::debug!(conn = %conn, room_code = code, fehler = %e, "Operation abgelehnt");
        }
        e => {
            tracing::warn!(conn = %conn, room_code = code, fehler = %e, "Operation fehlgeschlagen");
        }
    }
    vec![Ausgang::AnAbsender(ServerEvent::fehler(
        fehler.client_meldung(allgemein),
    ))]
}

/// `create-room`: neuer Raum, Ersteller ist X
pub async fn handle_create_room(
    conn: ConnectionId,
    name: String,
    state: &GatewayState,
) -> Vec<Ausgang> {
    match state.registry.raum_erstellen(conn, name).await {
        Ok(raum) => {
            let code = raum.code().clone();
            state.broadcaster.raum_beitreten(conn, &code);
            vec![Ausgang::AnAbsender(ServerEvent::RoomCreated {
                room_code: code,
                room: raum,
            })]
        }
        Err(e) => fehler_antwort(conn, None, &e, FEHLER_ERSTELLEN),
    }
}

/// `join-room`: zweiter Spieler, bei vollem Raum zusaetzlich `game-ready`
pub async fn handle_join_room(
    conn: ConnectionId,
    req: JoinRequest,
    state: &GatewayState,
) -> Vec<Ausgang> {
    let JoinRequest {
        room_code: code,
        player_name,
    } = req;

    let ergebnis = state
        .registry
        .ausfuehren(
            &code,
            |raum| raum.beitreten(conn, player_name),
            |beitritt, raum| {
                // Gruppe vor der Zustellung beitreten, damit der Beitretende selbst mitliest
                state.broadcaster.raum_beitreten(conn, &code);
                let mut ausgaenge = vec![Ausgang::AnRaum(
                    code.clone(),
                    ServerEvent::PlayerJoined { room: raum.clone() },
                )];
                if beitritt.bereit {
                    ausgaenge.push(Ausgang::AnRaum(code.clone(), ServerEvent::GameReady));
                }
                ausgaenge_zustellen(&state.broadcaster, conn, ausgaenge);
            },
        )
        .await;

    match ergebnis {
        Ok((beitritt, _)) => {
            tracing::info!(
                conn = %conn,
                room_code = %code,
                symbol = %beitritt.symbol,
                "Spieler beigetreten"
            );
            Vec::new()
        }
        Err(e) => fehler_antwort(conn, Some(&code), &e, FEHLER_BEITRETEN),
    }
}

/// Verteilt den neuen Stand an alle Verbindungen des Raums
fn stand_verteilen(state: &GatewayState, conn: ConnectionId, code: &RoomCode, raum: &Room) {
    ausgaenge_zustellen(
        &state.broadcaster,
        conn,
        vec![Ausgang::AnRaum(
            code.clone(),
            ServerEvent::GameUpdated { room: raum.clone() },
        )],
    );
}

/// `make-move`: Zug ausfuehren und neuen Stand verteilen
pub async fn handle_make_move(
    conn: ConnectionId,
    req: MoveRequest,
    state: &GatewayState,
) -> Vec<Ausgang> {
    let code = req.room_code;
    let ergebnis = state
        .registry
        .ausfuehren(
            &code,
            |raum| raum.zug_ausfuehren(conn, req.position),
            |_, raum| stand_verteilen(state, conn, &code, raum),
        )
        .await;

    match ergebnis {
        Ok(((), raum)) => {
            if let Some(m) = &state.metriken {
                m.moves_total.inc();
            }
            if let Some(winner) = raum.game_state().winner {
                tracing::info!(room_code = %code, ?winner, "Partie beendet");
            }
            Vec::new()
        }
        Err(e) => fehler_antwort(conn, Some(&code), &e, FEHLER_ZUG),
    }
}

/// `go-to-history`: zu einem frueheren Stand zurueckspringen
pub async fn handle_go_to_history(
    conn: ConnectionId,
    req: HistoryRequest,
    state: &GatewayState,
) -> Vec<Ausgang> {
    let code = req.room_code;
    let ergebnis = state
        .registry
        .ausfuehren(
            &code,
            |raum| raum.zurueckspulen(req.history_index),
            |_, raum| stand_verteilen(state, conn, &code, raum),
        )
        .await;

    match ergebnis {
        Ok(_) => {
            tracing::debug!(room_code = %code, index = req.history_index, "Historie zurueckgespult");
            Vec::new()
        }
        Err(e) => fehler_antwort(conn, Some(&code), &e, FEHLER_HISTORIE),
    }
}

/// `restart-game`: neue Partie im selben Raum
pub async fn handle_restart_game(
    conn: ConnectionId,
    code: RoomCode,
    state: &GatewayState,
) -> Vec<Ausgang> {
    let ergebnis = state
        .registry
        .ausfuehren(
            &code,
            |raum| {
                raum.neu_starten();
                Ok(())
            },
            |_, raum| stand_verteilen(state, conn, &code, raum),
        )
        .await;

    match ergebnis {
        Ok(_) => {
            tracing::debug!(room_code = %code, "Partie neu gestartet");
            Vec::new()
        }
        Err(e) => fehler_antwort(conn, Some(&code), &e, FEHLER_NEUSTART),
    }
}

/// Verbindung getrennt: aus allen Raeumen austragen, verbleibende informieren
pub async fn handle_disconnect(conn: ConnectionId, state: &GatewayState) -> Vec<Ausgang> {
    let raeume = state.broadcaster.raeume_von(&conn);
    let mut ausgaenge = Vec::with_capacity(raeume.len());

    for code in raeume {
        state.registry.verbindung_trennen(&code, conn).await;
        tracing::info!(conn = %conn, room_code = %code, "Spieler getrennt");
        ausgaenge.push(Ausgang::AnRaumAusser(
            code,
            conn,
            ServerEvent::PlayerDisconnected,
        ));
    }
    ausgaenge
}
