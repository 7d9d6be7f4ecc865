//! Raum-Registry – die Raeume im Speicher und ihr Spiegel in der Ablage
//!
//! Die Registry besitzt die kanonischen Raum-Instanzen. Jeder Raum liegt in
//! einem eigenen `tokio::sync::Mutex`, Operationen auf verschiedenen Raeumen
//! laufen parallel.
//!
//! ## Lebenszyklus eines Raums
//!
//! ```text
//! raum_erstellen / get_or_load ──► im Speicher ──(letzte Verbindung weg)──► entfernt
//!                                      │
//!                                      └── nach jeder Aenderung: Schreibpuffer ──► Persistenz-Worker ──► RoomStore
//! ```
//!
//! Beim Entfernen wird der Slot unter seinem Lock als `entfernt` markiert.
//! Wer danach denselben Slot sperrt, holt sich einen neuen. Geladen wird in
//! der Reihenfolge Speicher, Schreibpuffer, Ablage, damit ein entfernter Raum
//! mit noch ausstehendem Schreibvorgang nie veraltet zurueckkommt. Je Code
//! laedt nur ein Task gleichzeitig, parallele Lader warten auf dessen Slot.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, Notify, OwnedMutexGuard};
use tracing::{debug, info, warn};
use triqui_core::{ConnectionId, Room, RoomCode, SpielFehler, SpielResult};
use triqui_db::{RoomRecord, RoomStore};
use triqui_observability::TriquiMetrics;

use crate::error::{GatewayError, GatewayResult};

/// Maximale Versuche einen freien Raumcode zu finden
pub const MAX_CODE_VERSUCHE: usize = 10;

// ---------------------------------------------------------------------------
// Slot
// ---------------------------------------------------------------------------

/// Ein Raum im Speicher
#[derive(Debug)]
pub struct RaumSlot {
    pub raum: Room,
    /// Slot wurde aus der Registry entfernt und darf nicht mehr benutzt werden
    entfernt: bool,
}

impl RaumSlot {
    fn neu(raum: Room) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self {
            raum,
            entfernt: false,
        }))
    }
}

type SlotRef = Arc<Mutex<RaumSlot>>;

// ---------------------------------------------------------------------------
// Persistenz (Write-Behind)
// ---------------------------------------------------------------------------

/// Zustand des Schreibpuffers, geteilt mit dem Persistenz-Worker
struct Persistenz {
    store: Arc<dyn RoomStore>,
    /// Letzter noch nicht geschriebener Stand je Raum mit Sequenznummer
    puffer: DashMap<RoomCode, (u64, Room)>,
    sequenz: AtomicU64,
    ausstehend: AtomicUsize,
    leer: Notify,
    metriken: Option<TriquiMetrics>,
    db_status: Arc<AtomicBool>,
}

impl Persistenz {
    /// Schreibt den jeweils neuesten Stand; mehrere Auftraege fuer denselben
    /// Raum fallen dabei zu einem Schreibvorgang zusammen
    async fn worker(self: Arc<Self>, mut rx: mpsc::UnboundedReceiver<RoomCode>) {
        while let Some(code) = rx.recv().await {
            let eintrag = self.puffer.get(&code).map(|e| e.value().clone());
            if let Some((seq, raum)) = eintrag {
                match self.schreiben(&raum).await {
                    Ok(()) => {
                        self.db_status.store(true, Ordering::Relaxed);
                        debug!(room_code = %code, "Raum gespeichert");
                    }
                    Err(e) => {
                        // Kein Rollback, kein erneuter Versuch: der Speicher bleibt massgeblich
                        self.db_status.store(false, Ordering::Relaxed);
                        if let Some(m) = &self.metriken {
                            m.store_write_failures_total.inc();
                        }
                        warn!(room_code = %code, fehler = %e, "Raum konnte nicht gespeichert werden");
                    }
                }
                self.puffer.remove_if(&code, |_, (s, _)| *s == seq);
            }

            if self.ausstehend.fetch_sub(1, Ordering::AcqRel) == 1 {
                self.leer.notify_waiters();
            }
        }
        debug!("Persistenz-Worker beendet");
    }

    async fn schreiben(&self, raum: &Room) -> GatewayResult<()> {
        let record = RoomRecord::aus_room(raum)?;
        self.store.save(&record).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RoomRegistry
// ---------------------------------------------------------------------------

/// Prozessweite Registry aller aktiven Raeume
///
/// Clone teilt den inneren Zustand. Muss innerhalb einer tokio-Runtime
/// erstellt werden (startet den Persistenz-Worker). Der Worker endet, wenn
/// die letzte Kopie der Registry freigegeben ist.
#[derive(Clone)]
pub struct RoomRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    raeume: DashMap<RoomCode, SlotRef>,
    /// Eine Sperre je Code, der gerade aus Puffer oder Ablage geladen wird
    ladesperren: DashMap<RoomCode, Arc<Mutex<()>>>,
    persistenz: Arc<Persistenz>,
    schreib_tx: mpsc::UnboundedSender<RoomCode>,
}

impl RoomRegistry {
    pub fn neu(store: Arc<dyn RoomStore>) -> Self {
        Self::mit_beobachtung(store, None, Arc::new(AtomicBool::new(true)))
    }

    /// Erstellt eine Registry, die Metriken und DB-Status mitfuehrt
    pub fn mit_beobachtung(
        store: Arc<dyn RoomStore>,
        metriken: Option<TriquiMetrics>,
        db_status: Arc<AtomicBool>,
    ) -> Self {
        let persistenz = Arc::new(Persistenz {
            store,
            puffer: DashMap::new(),
            sequenz: AtomicU64::new(0),
            ausstehend: AtomicUsize::new(0),
            leer: Notify::new(),
            metriken,
            db_status,
        });

        let (schreib_tx, schreib_rx) = mpsc::unbounded_channel();
        tokio::spawn(Arc::clone(&persistenz).worker(schreib_rx));

        Self {
            inner: Arc::new(RegistryInner {
                raeume: DashMap::new(),
                ladesperren: DashMap::new(),
                persistenz,
                schreib_tx,
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Laden / Anlegen
    // -----------------------------------------------------------------------

    /// Gibt den Slot eines Raums zurueck, laedt ihn bei Bedarf nach
    ///
    /// Je Code laeuft hoechstens ein Ladevorgang. Wer auf die Ladesperre
    /// wartet, prueft danach erneut Speicher und Schreibpuffer.
    async fn get_or_load(&self, code: &RoomCode) -> GatewayResult<SlotRef> {
        if let Some(slot) = self.inner.raeume.get(code) {
            return Ok(Arc::clone(slot.value()));
        }

        let sperre = Arc::clone(self.inner.ladesperren.entry(code.clone()).or_default().value());
        let ergebnis = {
            let _laden = sperre.lock().await;
            self.laden_gesperrt(code).await
        };
        drop(sperre);
        self.inner
            .ladesperren
            .remove_if(code, |_, s| Arc::strong_count(s) == 1);
        ergebnis
    }

    /// Muss unter der Ladesperre des Codes aufgerufen werden
    ///
    /// Reihenfolge: Speicher, Schreibpuffer, Ablage.
    async fn laden_gesperrt(&self, code: &RoomCode) -> GatewayResult<SlotRef> {
        if let Some(slot) = self.inner.raeume.get(code) {
            return Ok(Arc::clone(slot.value()));
        }

        let gepuffert = self
            .inner
            .persistenz
            .puffer
            .get(code)
            .map(|e| e.value().1.clone());

        let raum = match gepuffert {
            Some(raum) => raum,
            None => match self.inner.persistenz.store.find_by_code(code).await? {
                Some(record) => record.into_room()?,
                None => return Err(SpielFehler::RaumNichtGefunden.into()),
            },
        };

        // put() kann denselben Code inzwischen belegt haben
        let slot = Arc::clone(
            self.inner
                .raeume
                .entry(code.clone())
                .or_insert_with(|| RaumSlot::neu(raum))
                .value(),
        );
        self.raeume_zaehlen();
        debug!(room_code = %code, "Raum in den Speicher geladen");
        Ok(slot)
    }

    /// Sperrt einen Raum und ueberspringt dabei bereits entfernte Slots
    async fn sperren(&self, code: &RoomCode) -> GatewayResult<(SlotRef, OwnedMutexGuard<RaumSlot>)> {
        loop {
            let slot = self.get_or_load(code).await?;
            let guard = Arc::clone(&slot).lock_owned().await;
            if !guard.entfernt {
                return Ok((slot, guard));
            }
        }
    }

    /// Kopie eines Raums (Speicher, Schreibpuffer oder Ablage)
    pub async fn laden(&self, code: &RoomCode) -> GatewayResult<Room> {
        let (slot, mut guard) = self.sperren(code).await?;
        let raum = guard.raum.clone();
        self.entfernen_wenn_verwaist(code, &slot, &mut guard);
        Ok(raum)
    }

    /// Legt einen neuen Raum mit eindeutigem Code an
    pub async fn raum_erstellen(
        &self,
        ersteller: ConnectionId,
        name: impl Into<String>,
    ) -> GatewayResult<Room> {
        let name = name.into();

        for _ in 0..MAX_CODE_VERSUCHE {
            let code = RoomCode::generieren();
            if self.code_belegt(&code).await? {
                debug!(room_code = %code, "Raumcode belegt, neuer Versuch");
                continue;
            }

            let raum = Room::erstellen(code.clone(), ersteller, name.clone());
            match self.inner.raeume.entry(code) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(frei) => {
                    frei.insert(RaumSlot::neu(raum.clone()));
                }
            }

            self.vormerken(&raum);
            self.raeume_zaehlen();
            info!(room_code = %raum.code(), conn = %ersteller, "Raum erstellt");
            return Ok(raum);
        }

        Err(GatewayError::CodesErschoepft(MAX_CODE_VERSUCHE))
    }

    async fn code_belegt(&self, code: &RoomCode) -> GatewayResult<bool> {
        if self.inner.raeume.contains_key(code) || self.inner.persistenz.puffer.contains_key(code) {
            return Ok(true);
        }
        Ok(self.inner.persistenz.store.find_by_code(code).await?.is_some())
    }

    /// Setzt die Kopie eines Raums im Speicher und plant das Speichern
    ///
    /// Ein vorhandener Slot wird ersetzt und als entfernt markiert.
    pub async fn put(&self, raum: Room) {
        let code = raum.code().clone();
        self.vormerken(&raum);
        let alt = self.inner.raeume.insert(code, RaumSlot::neu(raum));
        if let Some(alt) = alt {
            alt.lock().await.entfernt = true;
        }
        self.raeume_zaehlen();
    }

    // -----------------------------------------------------------------------
    // Operationen
    // -----------------------------------------------------------------------

    /// Fuehrt eine Operation unter dem Lock des Raums aus
    ///
    /// Bei Erfolg wird der neue Stand zum Speichern vorgemerkt und `verteilen`
    /// noch unter dem Lock aufgerufen. Ereignisse eines Raums erreichen die
    /// Send-Queues so in derselben Reihenfolge wie die Aenderungen. Der Raum
    /// wird danach entfernt, falls keine Verbindung mehr an ihm haengt.
    /// Gibt das Ergebnis der Operation und eine Kopie des Raums zurueck.
    pub async fn ausfuehren<T, F, V>(
        &self,
        code: &RoomCode,
        op: F,
        verteilen: V,
    ) -> GatewayResult<(T, Room)>
    where
        F: FnOnce(&mut Room) -> SpielResult<T>,
        V: FnOnce(&T, &Room),
    {
        let (slot, mut guard) = self.sperren(code).await?;

        let ergebnis = op(&mut guard.raum);
        if let Ok(wert) = &ergebnis {
            self.vormerken(&guard.raum);
            verteilen(wert, &guard.raum);
        }
        let raum = guard.raum.clone();
        self.entfernen_wenn_verwaist(code, &slot, &mut guard);

        Ok((ergebnis?, raum))
    }

    /// Entfernt eine Verbindung aus einem Raum im Speicher
    ///
    /// Raeume, die nicht im Speicher liegen, werden nicht nachgeladen.
    /// Gibt `true` zurueck wenn die Verbindung Mitglied war.
    pub async fn verbindung_trennen(&self, code: &RoomCode, conn: ConnectionId) -> bool {
        let slot = match self.inner.raeume.get(code) {
            Some(s) => Arc::clone(s.value()),
            None => return false,
        };
        let mut guard = slot.lock().await;
        if guard.entfernt {
            return false;
        }

        let war_mitglied = guard.raum.verbindung_trennen(conn);
        self.entfernen_wenn_verwaist(code, &slot, &mut guard);
        war_mitglied
    }

    /// Entfernt den Raum aus dem Speicher, wenn keine Verbindung mehr besteht
    pub async fn evict_if_orphaned(&self, code: &RoomCode) -> bool {
        let slot = match self.inner.raeume.get(code) {
            Some(s) => Arc::clone(s.value()),
            None => return false,
        };
        let mut guard = slot.lock().await;
        self.entfernen_wenn_verwaist(code, &slot, &mut guard)
    }

    /// Muss unter dem Lock des Slots aufgerufen werden
    fn entfernen_wenn_verwaist(&self, code: &RoomCode, slot: &SlotRef, guard: &mut RaumSlot) -> bool {
        if guard.entfernt || guard.raum.hat_verbindungen() {
            return false;
        }
        guard.entfernt = true;
        self.inner.raeume.remove_if(code, |_, s| Arc::ptr_eq(s, slot));
        self.raeume_zaehlen();
        debug!(room_code = %code, "Verwaister Raum aus dem Speicher entfernt");
        true
    }

    // -----------------------------------------------------------------------
    // Persistenz
    // -----------------------------------------------------------------------

    /// Merkt den aktuellen Stand fuer den Persistenz-Worker vor
    fn vormerken(&self, raum: &Room) {
        let p = &self.inner.persistenz;
        let seq = p.sequenz.fetch_add(1, Ordering::Relaxed);
        p.puffer.insert(raum.code().clone(), (seq, raum.clone()));
        p.ausstehend.fetch_add(1, Ordering::AcqRel);

        if self.inner.schreib_tx.send(raum.code().clone()).is_err() {
            // Worker laeuft nicht mehr (Runtime beendet)
            p.puffer.remove_if(raum.code(), |_, (s, _)| *s == seq);
            p.ausstehend.fetch_sub(1, Ordering::AcqRel);
            warn!(room_code = %raum.code(), "Persistenz-Worker nicht erreichbar");
        }
    }

    /// Wartet bis alle vorgemerkten Schreibvorgaenge abgeschlossen sind
    pub async fn persistenz_abwarten(&self) {
        let p = &self.inner.persistenz;
        loop {
            let benachrichtigt = p.leer.notified();
            tokio::pin!(benachrichtigt);
            benachrichtigt.as_mut().enable();

            if p.ausstehend.load(Ordering::Acquire) == 0 {
                return;
            }
            benachrichtigt.await;
        }
    }

    // -----------------------------------------------------------------------
    // Abfragen
    // -----------------------------------------------------------------------

    pub fn raum_anzahl(&self) -> usize {
        self.inner.raeume.len()
    }

    pub fn ist_geladen(&self, code: &RoomCode) -> bool {
        self.inner.raeume.contains_key(code)
    }

    fn raeume_zaehlen(&self) {
        if let Some(m) = &self.inner.persistenz.metriken {
            m.rooms_active.set(self.inner.raeume.len() as i64);
        }
    }
}
