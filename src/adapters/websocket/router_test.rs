#[cfg(test)]
mod tests {
    use crate::adapters::websocket::router::MessageRouter;
    use crate::domain::foundation::{DomainError, ErrorCode};
    use crate::domain::realtime::InboundMessage;
    use crate::ports::{handler_fn, MessageHandler};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    fn recorder(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Arc<dyn MessageHandler> {
        let log = log.clone();
        handler_fn(name, move |payload: &Value| {
            log.lock().unwrap().push(format!("{}:{}", name, payload));
            Ok(())
        })
    }

    fn entries(log: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[test]
    fn every_subscribed_handler_sees_message_exactly_once_in_order() {
        let router = MessageRouter::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let _a = router.subscribe("system_metrics", recorder("a", &log));
        let _b = router.subscribe("system_metrics", recorder("b", &log));

        let invoked = router.route_frame(r#"{"type":"system_metrics","cpu":1}"#);

        assert_eq!(invoked, 2);
        assert_eq!(entries(&log), vec![r#"a:{"cpu":1}"#, r#"b:{"cpu":1}"#]);
    }

    #[test]
    fn handlers_only_see_their_own_type() {
        let router = MessageRouter::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let _sub = router.subscribe("system_alert", recorder("alerts", &log));

        assert_eq!(router.route_frame(r#"{"type":"system_metrics"}"#), 0);
        assert!(entries(&log).is_empty());
    }

    #[test]
    fn dropped_subscription_receives_nothing() {
        let router = MessageRouter::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let sub = router.subscribe("pipeline_log", recorder("a", &log));
        let _other = router.subscribe("pipeline_log", recorder("b", &log));

        drop(sub);
        router.route_frame(r#"{"type":"pipeline_log","message":"x"}"#);

        assert_eq!(entries(&log), vec![r#"b:{"message":"x"}"#]);
        assert_eq!(router.handler_count("pipeline_log"), 1);
    }

    #[test]
    fn unsubscribe_by_handler_removes_only_that_handler() {
        let router = MessageRouter::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = recorder("a", &log);
        let b = recorder("b", &log);
        let sub_a = router.subscribe("t", a.clone());
        let _sub_b = router.subscribe("t", b);

        assert_eq!(router.unsubscribe("t", &a), 1);
        assert!(!sub_a.is_active());
        router.route_frame(r#"{"type":"t"}"#);

        assert_eq!(entries(&log), vec!["b:{}"]);
    }

    #[test]
    fn unsubscribing_unknown_handler_is_noop() {
        let router = MessageRouter::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let stranger = recorder("stranger", &log);

        assert_eq!(router.unsubscribe("t", &stranger), 0);
        assert_eq!(router.unsubscribe("never-registered", &stranger), 0);
    }

    #[test]
    fn failing_handler_does_not_stop_the_others() {
        let router = MessageRouter::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let _bad = router.subscribe(
            "t",
            handler_fn("Bad", |_| {
                Err(DomainError::new(ErrorCode::InvalidPayload, "nope"))
            }),
        );
        let _good = router.subscribe("t", recorder("good", &log));

        assert_eq!(router.route_frame(r#"{"type":"t"}"#), 2);
        assert_eq!(entries(&log), vec!["good:{}"]);
    }

    #[test]
    fn panicking_handler_is_isolated() {
        let router = MessageRouter::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let _boom = router.subscribe("t", handler_fn("Boom", |_| panic!("handler exploded")));
        let _good = router.subscribe("t", recorder("good", &log));

        router.route_frame(r#"{"type":"t"}"#);
        router.route_frame(r#"{"type":"t"}"#);

        assert_eq!(entries(&log).len(), 2);
    }

    #[test]
    fn malformed_frames_are_dropped_and_routing_continues() {
        let router = MessageRouter::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let _sub = router.subscribe("t", recorder("a", &log));

        assert_eq!(router.route_frame("not json at all"), 0);
        assert_eq!(router.route_frame("[1,2]"), 0);
        assert_eq!(router.route_frame(r#"{"no_type":true}"#), 0);
        assert_eq!(router.route_frame(r#"{"type":"t","ok":true}"#), 1);

        assert_eq!(entries(&log), vec![r#"a:{"ok":true}"#]);
    }

    #[test]
    fn catch_all_sees_every_parsed_message() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let router = MessageRouter::with_catch_all(Arc::new(move |msg: &InboundMessage| {
            sink.lock().unwrap().push(msg.message_type.clone());
        }));

        router.route_frame(r#"{"type":"system_metrics"}"#);
        router.route_frame(r#"{"type":"unknown_kind"}"#);
        router.route_frame("garbage");

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["system_metrics".to_string(), "unknown_kind".to_string()]
        );
    }

    #[test]
    fn handler_removed_mid_dispatch_is_skipped() {
        let router = Arc::new(MessageRouter::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        let victim = recorder("victim", &log);

        let remover_router = router.clone();
        let remover_target = victim.clone();
        let _remover = router.subscribe(
            "t",
            handler_fn("Remover", move |_| {
                remover_router.unsubscribe("t", &remover_target);
                Ok(())
            }),
        );
        let _victim = router.subscribe("t", victim);

        assert_eq!(router.route_frame(r#"{"type":"t"}"#), 1);
        assert!(entries(&log).is_empty());
    }

    #[test]
    fn subscribed_types_are_listed_and_pruned() {
        let router = MessageRouter::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let alert = router.subscribe("system_alert", recorder("a", &log));
        let _metrics = router.subscribe("system_metrics", recorder("m", &log));

        assert_eq!(router.subscribed_types(), vec!["system_alert", "system_metrics"]);
        alert.unsubscribe();
        assert_eq!(router.subscribed_types(), vec!["system_metrics"]);
        assert_eq!(router.handler_count("system_alert"), 0);
    }

    #[test]
    fn subscription_outliving_router_drops_cleanly() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sub = {
            let router = MessageRouter::new();
            router.subscribe("t", recorder("a", &log))
        };
        assert_eq!(sub.message_type(), "t");
        drop(sub);
    }

    #[test]
    fn dispatch_takes_normalised_payload() {
        let router = MessageRouter::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let _sub = router.subscribe("pipeline_progress", recorder("p", &log));

        router.route_frame(r#"{"type":"pipeline_progress","data":{"pipeline_id":7}}"#);
        router.dispatch("pipeline_progress", &json!({"pipeline_id": 8}));

        assert_eq!(
            entries(&log),
            vec![r#"p:{"pipeline_id":7}"#, r#"p:{"pipeline_id":8}"#]
        );
    }
}
