mod common;

use speculate2::speculate;

speculate! {
    use std::fs::{self, File};

    use chrono::Utc;
    use outreach::import::{export_prospects, import_prospects, ImportError};
    use outreach_core::models::{FunnelFlag, ProspectFilter};
    use tempfile::TempDir;

    use crate::common::{advance_to, database, sequencer, RecordingMailer};

    before {
        let db = database();
    }

    describe "import" {
        it "stores one prospect for emails differing only in case" {
            let report = import_prospects(&db, "email\nFoo@X.com\nfoo@x.com\n".as_bytes()).unwrap();
            assert_eq!(report.imported, 1);
            assert_eq!(report.duplicates, 1);
            assert_eq!(db.count_prospects(ProspectFilter::All).unwrap(), 1);
            assert!(db.find_prospect("foo@x.com").unwrap().is_some());
        }

        it "fills gaps on re-import without touching outreach state" {
            import_prospects(&db, "email,company\nann@x.com,\n".as_bytes()).unwrap();
            advance_to(&db, "ann@x.com", 2, Utc::now());

            let csv = "email,company,source,notes\nann@x.com,Acme,second-list,met at expo\n";
            let report = import_prospects(&db, csv.as_bytes()).unwrap();
            assert_eq!(report.duplicates, 1);

            let ann = db.find_prospect("ann@x.com").unwrap().unwrap();
            assert_eq!(ann.company.as_deref(), Some("Acme"));
            assert_eq!(ann.source, "manual");
            assert_eq!(ann.sequence_step, 2);
            assert!(ann.notes.unwrap().contains("met at expo"));
        }

        it "spans several store batches" {
            let mut csv = String::from("email\n");
            for i in 0..250 {
                csv.push_str(&format!("user{}@bulk.com\n", i));
            }
            let report = import_prospects(&db, csv.as_bytes()).unwrap();
            assert_eq!(report.imported, 250);
            assert_eq!(db.count_prospects(ProspectFilter::NotContacted).unwrap(), 250);
        }

        it "reads from a file on disk" {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("prospects.csv");
            fs::write(&path, "Email,FirstName,LastName\njo@x.com,Jo,Park\n").unwrap();

            let report = import_prospects(&db, File::open(&path).unwrap()).unwrap();
            assert_eq!(report.imported, 1);
            let jo = db.find_prospect("jo@x.com").unwrap().unwrap();
            assert_eq!(jo.last_name.as_deref(), Some("Park"));
        }

        it "rejects malformed uploads" {
            assert!(matches!(
                import_prospects(&db, "".as_bytes()),
                Err(ImportError::Validation(_))
            ));
        }
    }

    describe "export" {
        it "writes only the rows matching the filter" {
            import_prospects(&db, "email\na@x.com\nb@x.com\nc@x.com\n".as_bytes()).unwrap();
            advance_to(&db, "b@x.com", 1, Utc::now());
            let seq = sequencer(&db, RecordingMailer::new());
            seq.toggle_funnel_flag("c@x.com", FunnelFlag::BecameClient, true).unwrap();

            let mut contacted = Vec::new();
            assert_eq!(export_prospects(&db, ProspectFilter::Contacted, &mut contacted).unwrap(), 1);
            let contacted = String::from_utf8(contacted).unwrap();
            assert!(contacted.starts_with("email,first_name,last_name"));
            assert!(contacted.contains("b@x.com"));
            assert!(!contacted.contains("a@x.com"));

            let mut clients = Vec::new();
            export_prospects(&db, ProspectFilter::Clients, &mut clients).unwrap();
            let clients = String::from_utf8(clients).unwrap();
            assert_eq!(clients.lines().count(), 2);
            assert!(clients.contains("c@x.com"));

            let mut everyone = Vec::new();
            assert_eq!(export_prospects(&db, ProspectFilter::All, &mut everyone).unwrap(), 3);
        }

        it "accepts the short filter aliases" {
            assert_eq!(ProspectFilter::from_str("demo"), Some(ProspectFilter::DemoBooked));
            assert_eq!(ProspectFilter::from_str("client"), Some(ProspectFilter::Clients));
            assert_eq!(ProspectFilter::from_str("nonsense"), None);
        }
    }
}
