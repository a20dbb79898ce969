mod common;

use speculate2::speculate;

speculate! {
    use chrono::{Duration, Utc};
    use outreach::sequencer::{
        BatchCriteria, SequencerError, StatusEvent, StatusEventKind, StatusOutcome,
        SCHEDULING_SOURCE,
    };
    use outreach_core::models::{FunnelFlag, NewProspect, SourceFilter};
    use tokio_test::block_on;

    use crate::common::{
        add_prospect, advance_to, database, sequencer, GatedMailer, RecordingMailer,
    };

    before {
        let db = database();
        let mailer = RecordingMailer::new();
        let seq = sequencer(&db, mailer.clone());
    }

    describe "send_next" {
        it "sends the first template to a new prospect and advances to step 1" {
            add_prospect(&db, "a@b.com");
            let before = Utc::now();

            let outcome = block_on(seq.send_next("a@b.com")).unwrap();

            assert_eq!(outcome.email_number, 1);
            let stored = db.find_prospect("a@b.com").unwrap().unwrap();
            assert_eq!(stored.sequence_step, 1);
            assert!(stored.email_sent);
            let sent_at = stored.email_sent_at.unwrap();
            assert!(sent_at >= before && sent_at <= Utc::now());

            let sent = mailer.sent();
            assert_eq!(sent.len(), 1);
            assert_eq!(sent[0].to, "a@b.com");
            assert_eq!(sent[0].subject, outcome.subject);
        }

        it "walks 1, 2, 3 and then refuses without touching state" {
            add_prospect(&db, "walk@b.com");
            for expected in 1..=3u8 {
                let outcome = block_on(seq.send_next("walk@b.com")).unwrap();
                assert_eq!(outcome.email_number, expected);
            }
            let done = db.find_prospect("walk@b.com").unwrap().unwrap();

            let err = block_on(seq.send_next("walk@b.com")).unwrap_err();
            assert!(matches!(err, SequencerError::SequenceExhausted(_)));

            let after = db.find_prospect("walk@b.com").unwrap().unwrap();
            assert_eq!(after.sequence_step, 3);
            assert_eq!(after.email_sent_at, done.email_sent_at);
            assert_eq!(mailer.sent().len(), 3);
        }

        it "refuses a prospect already at step 3" {
            add_prospect(&db, "done@b.com");
            let done = advance_to(&db, "done@b.com", 3, Utc::now() - Duration::days(10));

            let err = block_on(seq.send_next("done@b.com")).unwrap_err();
            assert!(matches!(err, SequencerError::SequenceExhausted(_)));
            assert_eq!(err.to_string(), "Prospect done@b.com has already received all 3 emails");
            assert!(mailer.sent().is_empty());

            let after = db.find_prospect("done@b.com").unwrap().unwrap();
            assert_eq!(after.sequence_step, done.sequence_step);
            assert_eq!(after.email_sent_at, done.email_sent_at);
        }

        it "leaves state untouched when the mail sender fails" {
            add_prospect(&db, "fail@b.com");
            let earlier = advance_to(&db, "fail@b.com", 1, Utc::now() - Duration::days(3));
            mailer.set_failing(true);

            let err = block_on(seq.send_next("fail@b.com")).unwrap_err();
            assert!(matches!(err, SequencerError::Transport(_)));

            let after = db.find_prospect("fail@b.com").unwrap().unwrap();
            assert_eq!(after.sequence_step, earlier.sequence_step);
            assert_eq!(after.email_sent, earlier.email_sent);
            assert_eq!(after.email_sent_at, earlier.email_sent_at);
        }

        it "reports unknown prospects as not found" {
            let err = block_on(seq.send_next("ghost@b.com")).unwrap_err();
            assert!(matches!(err, SequencerError::NotFound(_)));
            assert!(err.is_skip());
        }

        it "matches the stored record regardless of address case" {
            add_prospect(&db, "case@b.com");
            let outcome = block_on(seq.send_next("  CASE@B.com ")).unwrap();
            assert_eq!(outcome.email, "case@b.com");
        }

        it "lets only one of two concurrent sends to the same prospect through" {
            add_prospect(&db, "race@b.com");
            let gated = GatedMailer::new();
            let racing = sequencer(&db, gated.clone());

            let first = racing.send_next("race@b.com");
            let second = async {
                gated.entered.notified().await;
                let result = racing.send_next("race@b.com").await;
                gated.release.notify_one();
                result
            };
            let (first, second) = block_on(async { tokio::join!(first, second) });

            assert_eq!(first.unwrap().email_number, 1);
            assert!(matches!(second, Err(SequencerError::Conflict(_))));
            assert_eq!(gated.sent().len(), 1);
            let stored = db.find_prospect("race@b.com").unwrap().unwrap();
            assert_eq!(stored.sequence_step, 1);
        }

        it "personalizes the body with the prospect's details" {
            db.upsert_prospect(&NewProspect {
                first_name: Some("Dana".into()),
                company: Some("Acme".into()),
                ..NewProspect::new("dana@acme.com")
            })
            .unwrap();

            block_on(seq.send_next("dana@acme.com")).unwrap();

            let body = &mailer.sent()[0].body;
            assert!(body.contains("Dana"));
            assert!(!body.contains("{{"));
        }
    }

    describe "select_batch" {
        it "skips exhausted and recently emailed prospects, never-contacted first" {
            let now = Utc::now();
            add_prospect(&db, "zero@b.com");
            add_prospect(&db, "one@b.com");
            add_prospect(&db, "three@b.com");
            add_prospect(&db, "fresh@b.com");
            advance_to(&db, "one@b.com", 1, now - Duration::hours(72));
            advance_to(&db, "three@b.com", 3, now - Duration::hours(72));
            advance_to(&db, "fresh@b.com", 1, now - Duration::hours(1));

            let criteria = BatchCriteria {
                source: None,
                min_gap: Duration::hours(48),
                limit: 50,
            };
            let batch = seq.select_batch(&criteria, now).unwrap();
            let emails: Vec<_> = batch.iter().map(|p| p.email.as_str()).collect();
            assert_eq!(emails, vec!["zero@b.com", "one@b.com"]);
        }

        it "honors the limit and the source filters" {
            for (email, source) in [
                ("a@spring.com", "spring-2026"),
                ("b@spring.com", "spring-2026-b"),
                ("c@fall.com", "fall"),
            ] {
                db.upsert_prospect(&NewProspect {
                    source: Some(source.into()),
                    ..NewProspect::new(email)
                })
                .unwrap();
            }
            let now = Utc::now();

            let prefix = BatchCriteria {
                source: Some(SourceFilter::Prefix("spring-".into())),
                min_gap: Duration::hours(48),
                limit: 50,
            };
            assert_eq!(seq.select_batch(&prefix, now).unwrap().len(), 2);

            let exact = BatchCriteria {
                source: Some(SourceFilter::Exact("spring-2026".into())),
                ..prefix.clone()
            };
            let only = seq.select_batch(&exact, now).unwrap();
            assert_eq!(only.len(), 1);
            assert_eq!(only[0].email, "a@spring.com");

            let capped = BatchCriteria { source: None, limit: 1, ..prefix };
            assert_eq!(seq.select_batch(&capped, now).unwrap().len(), 1);
        }

        it "treats a gap too large to subtract as never-contacted only" {
            add_prospect(&db, "new@b.com");
            add_prospect(&db, "old@b.com");
            advance_to(&db, "old@b.com", 1, Utc::now() - Duration::days(3650));

            let criteria = BatchCriteria {
                source: None,
                min_gap: Duration::MAX,
                limit: 50,
            };
            let batch = seq.select_batch(&criteria, Utc::now()).unwrap();
            let emails: Vec<_> = batch.iter().map(|p| p.email.as_str()).collect();
            assert_eq!(emails, vec!["new@b.com"]);
        }
    }

    describe "run_batch" {
        it "sends to every due prospect and reports the counts" {
            add_prospect(&db, "x@b.com");
            add_prospect(&db, "y@b.com");
            let criteria = BatchCriteria {
                source: None,
                min_gap: Duration::hours(48),
                limit: 10,
            };

            let report = block_on(seq.run_batch(&criteria)).unwrap();
            assert_eq!(report.sent, 2);
            assert_eq!(report.failed, 0);
            assert_eq!(report.total_processed, 2);
            assert_eq!(report.next_batch_in_hours, 48);
            assert_eq!(report.message, "Campaign batch completed");

            let again = block_on(seq.run_batch(&criteria)).unwrap();
            assert_eq!(again.sent, 0);
            assert_eq!(again.message, "No prospects ready for email");
        }

        it "collects transport failures without aborting" {
            add_prospect(&db, "x@b.com");
            add_prospect(&db, "y@b.com");
            mailer.set_failing(true);

            let report = block_on(seq.run_batch(&BatchCriteria {
                source: None,
                min_gap: Duration::hours(48),
                limit: 10,
            }))
            .unwrap();
            assert_eq!(report.sent, 0);
            assert_eq!(report.failed, 2);
            assert_eq!(report.errors.len(), 2);
            assert!(report.errors[0].contains("service unavailable"));
        }
    }

    describe "apply_status_event" {
        it "creates a booked prospect for an unknown email" {
            let event = StatusEvent {
                display_name: Some("Jane Doe".into()),
                scheduled_at: Some("2026-10-21T15:00:00Z".into()),
                ..StatusEvent::new(StatusEventKind::DemoBooked)
            };

            let update = seq.apply_status_event("Jane@Acme.com", &event).unwrap();
            assert_eq!(update.outcome, StatusOutcome::Created);

            let jane = db.find_prospect("jane@acme.com").unwrap().unwrap();
            assert_eq!(jane.first_name.as_deref(), Some("Jane"));
            assert_eq!(jane.last_name.as_deref(), Some("Doe"));
            assert!(jane.demo_booked);
            assert!(jane.demo_booked_at.is_some());
            assert_eq!(jane.source, SCHEDULING_SOURCE);
            assert_eq!(jane.sequence_step, 0);
        }

        it "clears the booking and keeps earlier notes on cancel" {
            db.upsert_prospect(&NewProspect {
                notes: Some("x".into()),
                ..NewProspect::new("known@b.com")
            })
            .unwrap();
            seq.apply_status_event("known@b.com", &StatusEvent::new(StatusEventKind::DemoBooked))
                .unwrap();

            let cancel = StatusEvent {
                reason: Some("conflict".into()),
                ..StatusEvent::new(StatusEventKind::DemoCanceled)
            };
            let update = seq.apply_status_event("known@b.com", &cancel).unwrap();
            assert_eq!(update.outcome, StatusOutcome::Updated);

            let known = db.find_prospect("known@b.com").unwrap().unwrap();
            assert!(!known.demo_booked);
            assert_eq!(known.demo_booked_at, None);
            let notes = known.notes.unwrap();
            assert!(notes.starts_with("x"));
            assert!(notes.contains("conflict"));
        }

        it "cancelling twice stays canceled and adds one note per call" {
            add_prospect(&db, "twice@b.com");
            let cancel = StatusEvent {
                reason: Some("busy".into()),
                ..StatusEvent::new(StatusEventKind::DemoCanceled)
            };

            seq.apply_status_event("twice@b.com", &cancel).unwrap();
            let first = db.find_prospect("twice@b.com").unwrap().unwrap();
            seq.apply_status_event("twice@b.com", &cancel).unwrap();
            let second = db.find_prospect("twice@b.com").unwrap().unwrap();

            assert!(!second.demo_booked);
            assert_eq!(second.demo_booked_at, None);
            let count = |n: &Option<String>| n.as_deref().unwrap_or("").matches("Demo canceled").count();
            assert_eq!(count(&first.notes), 1);
            assert_eq!(count(&second.notes), 2);
        }

        it "re-books a known prospect on reschedule" {
            add_prospect(&db, "moved@b.com");
            let event = StatusEvent {
                scheduled_at: Some("2026-11-02T09:30:00Z".into()),
                ..StatusEvent::new(StatusEventKind::DemoRescheduled)
            };

            let update = seq.apply_status_event("moved@b.com", &event).unwrap();
            assert_eq!(update.outcome, StatusOutcome::Updated);

            let moved = db.find_prospect("moved@b.com").unwrap().unwrap();
            assert!(moved.demo_booked);
            assert!(moved.demo_booked_at.is_some());
            assert!(moved.notes.unwrap().contains("Demo rescheduled"));
        }

        it "does not create prospects for cancel or reschedule" {
            for kind in [StatusEventKind::DemoCanceled, StatusEventKind::DemoRescheduled] {
                let update = seq.apply_status_event("nobody@b.com", &StatusEvent::new(kind)).unwrap();
                assert_eq!(update.outcome, StatusOutcome::NotFound);
            }
            assert!(db.find_prospect("nobody@b.com").unwrap().is_none());
        }

        it "keeps the original source when a booking arrives for a known prospect" {
            db.upsert_prospect(&NewProspect {
                source: Some("linkedin".into()),
                ..NewProspect::new("lead@b.com")
            })
            .unwrap();
            seq.apply_status_event("lead@b.com", &StatusEvent::new(StatusEventKind::DemoBooked))
                .unwrap();
            let lead = db.find_prospect("lead@b.com").unwrap().unwrap();
            assert_eq!(lead.source, "linkedin");
            assert!(lead.demo_booked);
        }
    }

    describe "toggle_funnel_flag" {
        it "stamps on set and clears on unset, independently of other flags" {
            add_prospect(&db, "flag@b.com");

            let client = seq.toggle_funnel_flag("flag@b.com", FunnelFlag::BecameClient, true).unwrap();
            assert!(client.became_client);
            assert!(client.became_client_at.is_some());
            assert!(!client.demo_booked);

            let cleared = seq.toggle_funnel_flag("flag@b.com", FunnelFlag::BecameClient, false).unwrap();
            assert!(!cleared.became_client);
            assert_eq!(cleared.became_client_at, None);
        }

        it "reports unknown prospects" {
            let err = seq.toggle_funnel_flag("ghost@b.com", FunnelFlag::Replied, true).unwrap_err();
            assert!(matches!(err, SequencerError::NotFound(_)));
        }
    }
}
