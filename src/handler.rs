// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Label -> callback handler tables, parameterized by the engine-side
//! context type so a hub's handlers and a node's handlers cannot be
//! confused, following the teacher's `RequestHandler` trait
//! (`hdds::rpc::server`) generalized over a small context argument.

use dashmap::DashMap;
use std::marker::PhantomData;
use std::sync::Arc;

/// Handles a `POST` or `GET`: takes the request body, returns a reply body.
pub trait RequestHandler<Ctx>: Send + Sync + 'static {
    fn handle(&self, ctx: &Ctx, payload: &[u8]) -> Vec<u8>;
}

impl<Ctx, F> RequestHandler<Ctx> for F
where
    F: Fn(&Ctx, &[u8]) -> Vec<u8> + Send + Sync + 'static,
{
    fn handle(&self, ctx: &Ctx, payload: &[u8]) -> Vec<u8> {
        self(ctx, payload)
    }
}

/// Handles a `NOTICE`: one-way, no reply body expected.
pub trait NoticeHandler<Ctx>: Send + Sync + 'static {
    fn handle(&self, ctx: &Ctx, payload: &[u8]);
}

impl<Ctx, F> NoticeHandler<Ctx> for F
where
    F: Fn(&Ctx, &[u8]) + Send + Sync + 'static,
{
    fn handle(&self, ctx: &Ctx, payload: &[u8]) {
        self(ctx, payload)
    }
}

/// Label-keyed request handler table for one engine context type.
///
/// `Ctx` is `()` for the zero-argument demos, or a borrowed handle type for
/// handlers that need to call back into the owning engine (post/notice).
pub struct HandlerTable<Ctx> {
    requests: DashMap<String, Arc<dyn RequestHandler<Ctx>>>,
    notices: DashMap<String, Arc<dyn NoticeHandler<Ctx>>>,
    _ctx: PhantomData<Ctx>,
}

impl<Ctx> Default for HandlerTable<Ctx> {
    fn default() -> Self {
        Self {
            requests: DashMap::new(),
            notices: DashMap::new(),
            _ctx: PhantomData,
        }
    }
}

impl<Ctx: 'static> HandlerTable<Ctx> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_request(&self, label: impl Into<String>, handler: impl RequestHandler<Ctx>) {
        self.requests.insert(label.into(), Arc::new(handler));
    }

    pub fn register_notice(&self, label: impl Into<String>, handler: impl NoticeHandler<Ctx>) {
        self.notices.insert(label.into(), Arc::new(handler));
    }

    /// Runs the registered request handler for `label`, if any. Unknown
    /// labels are silently dropped per the dispatcher contract.
    pub fn dispatch_request(&self, label: &str, ctx: &Ctx, payload: &[u8]) -> Option<Vec<u8>> {
        self.requests.get(label).map(|h| h.handle(ctx, payload))
    }

    pub fn dispatch_notice(&self, label: &str, ctx: &Ctx, payload: &[u8]) -> bool {
        match self.notices.get(label) {
            Some(h) => {
                h.handle(ctx, payload);
                true
            }
            None => false,
        }
    }
}

/// Marker context types so a hub's table and a node's table are distinct
/// instantiations of `HandlerTable<Ctx>`.
pub struct HubCtx;
pub struct NodeCtx;

pub type HubHandlers = HandlerTable<HubCtx>;
pub type NodeHandlers = HandlerTable<NodeCtx>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_known_label_runs_handler() {
        let table: HandlerTable<HubCtx> = HandlerTable::new();
        table.register_request("echo", |_ctx: &HubCtx, payload: &[u8]| payload.to_vec());
        let reply = table.dispatch_request("echo", &HubCtx, b"hi").unwrap();
        assert_eq!(reply, b"hi");
    }

    #[test]
    fn dispatch_unknown_label_is_none() {
        let table: HandlerTable<HubCtx> = HandlerTable::new();
        assert!(table.dispatch_request("missing", &HubCtx, b"x").is_none());
    }

    #[test]
    fn notice_handler_runs_and_reports_known() {
        let table: HandlerTable<NodeCtx> = HandlerTable::new();
        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        table.register_notice("ping", move |_ctx: &NodeCtx, payload: &[u8]| {
            seen2.lock().unwrap().push(payload.to_vec());
        });
        assert!(table.dispatch_notice("ping", &NodeCtx, b"x"));
        assert!(!table.dispatch_notice("other", &NodeCtx, b"x"));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
