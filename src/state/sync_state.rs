// ============================================================================
// SYNC STATE - estado del reenvío compartido entre el servicio y la UI
// ============================================================================

use std::cell::RefCell;
use std::rc::Rc;

use chrono::{DateTime, Utc};

use crate::models::sync::{FlushReport, SyncState};

type ReportListener = Rc<dyn Fn(&FlushReport)>;

/// Estado de sync (clonar es barato, todos los clones lo comparten)
#[derive(Clone)]
pub struct SyncStateWrapper {
    pub sync_state: Rc<RefCell<SyncState>>,
    pub is_online: Rc<RefCell<bool>>,
    pub last_report: Rc<RefCell<Option<FlushReport>>>,
    pub last_flush_at: Rc<RefCell<Option<DateTime<Utc>>>>,
    report_listeners: Rc<RefCell<Vec<ReportListener>>>,
}

impl SyncStateWrapper {
    pub fn new() -> Self {
        Self {
            sync_state: Rc::new(RefCell::new(SyncState::Idle)),
            is_online: Rc::new(RefCell::new(false)),
            last_report: Rc::new(RefCell::new(None)),
            last_flush_at: Rc::new(RefCell::new(None)),
            report_listeners: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn get_sync_state(&self) -> SyncState {
        *self.sync_state.borrow()
    }

    pub fn is_flushing(&self) -> bool {
        self.get_sync_state() == SyncState::Flushing
    }

    /// Pasa de Idle a Flushing. Devuelve false si ya hay un pase en curso.
    pub fn try_begin_flush(&self) -> bool {
        let mut state = self.sync_state.borrow_mut();
        if *state == SyncState::Flushing {
            return false;
        }
        *state = SyncState::Flushing;
        true
    }

    pub fn end_flush(&self) {
        *self.sync_state.borrow_mut() = SyncState::Idle;
    }

    pub fn set_online(&self, online: bool) {
        *self.is_online.borrow_mut() = online;
    }

    pub fn get_online(&self) -> bool {
        *self.is_online.borrow()
    }

    pub fn get_last_report(&self) -> Option<FlushReport> {
        self.last_report.borrow().clone()
    }

    pub fn get_last_flush_at(&self) -> Option<DateTime<Utc>> {
        *self.last_flush_at.borrow()
    }

    /// Se llama con cada reporte completado (aquí se engancha el toast)
    pub fn on_report<F>(&self, listener: F)
    where
        F: Fn(&FlushReport) + 'static,
    {
        self.report_listeners.borrow_mut().push(Rc::new(listener));
    }

    /// Guarda el reporte y avisa a los listeners
    pub fn publish_report(&self, report: FlushReport) {
        *self.last_report.borrow_mut() = Some(report.clone());
        *self.last_flush_at.borrow_mut() = Some(Utc::now());

        let listeners: Vec<ReportListener> = self.report_listeners.borrow().clone();
        for listener in listeners {
            listener(&report);
        }
    }
}

impl Default for SyncStateWrapper {
    fn default() -> Self {
        Self::new()
    }
}
