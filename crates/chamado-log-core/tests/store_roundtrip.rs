//! End-to-end store tests against the real file persister: persistence
//! across reopen, legacy snapshot migration on open, and backup round-trips.

use chrono::Utc;
use tempfile::TempDir;

use chamado_log_core::{
    JsonFilePersister, NewTicket, Status, TicketPatch, TicketStore,
};

fn open(dir: &TempDir) -> TicketStore {
    let persister = JsonFilePersister::new(dir.path().join("chamados.json"));
    TicketStore::open(Box::new(persister)).expect("open store")
}

fn draft(wo: &str, status: Status, presencial: bool) -> NewTicket {
    NewTicket {
        wo: wo.into(),
        uf: "SP".into(),
        status,
        presencial,
    }
}

#[test]
fn missing_file_opens_empty() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    assert!(store.is_empty());
}

#[test]
fn mutations_survive_a_reopen() {
    let dir = TempDir::new().unwrap();

    {
        let mut store = open(&dir);
        store.add(&draft("A1", Status::Concluido, true), Utc::now()).unwrap();
        store.add(&draft("A2", Status::Diagnostico, false), Utc::now()).unwrap();
        let id = store.tickets()[1].id;
        store
            .edit(
                id,
                TicketPatch {
                    uf: Some("rj".into()),
                    ..TicketPatch::default()
                },
            )
            .unwrap();
    }

    let store = open(&dir);
    assert_eq!(store.len(), 2);
    assert_eq!(store.tickets()[0].wo, "A2");
    assert_eq!(store.tickets()[1].wo, "A1");
    assert_eq!(store.tickets()[1].uf, "RJ");
    assert_eq!(store.tickets()[1].is_presencial, Some(true));
}

#[test]
fn delete_persists() {
    let dir = TempDir::new().unwrap();

    {
        let mut store = open(&dir);
        store.add(&draft("A1", Status::Concluido, false), Utc::now()).unwrap();
        let id = store.tickets()[0].id;
        assert!(store.delete(id).unwrap());
    }

    let store = open(&dir);
    assert!(store.is_empty());
}

#[test]
fn legacy_snapshot_is_migrated_on_open() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("chamados.json");
    std::fs::write(
        &path,
        r#"[
            {"id": 1, "wo": "OLD1", "uf": "SP", "status": "Concluído",
             "timestamp": "2024-03-15T17:30:00.000Z", "resolutionType": "Presencial"},
            {"id": 2, "wo": "OLD2", "uf": "RJ", "status": "Diagnóstico",
             "timestamp": "2024-03-16T10:00:00.000Z", "resolutionType": "Remoto"}
        ]"#,
    )
    .unwrap();

    let store = TicketStore::open(Box::new(JsonFilePersister::new(&path))).unwrap();
    assert_eq!(store.tickets()[0].is_presencial, Some(true));
    assert_eq!(store.tickets()[1].is_presencial, None);
}

#[test]
fn corrupt_snapshot_opens_empty_instead_of_failing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("chamados.json");
    std::fs::write(&path, "{definitely not json").unwrap();

    let store = TicketStore::open(Box::new(JsonFilePersister::new(&path))).unwrap();
    assert!(store.is_empty());
}

#[test]
fn backup_round_trips_through_files() {
    let dir = TempDir::new().unwrap();

    let exported = {
        let mut store = open(&dir);
        store.add(&draft("B1", Status::Concluido, true), Utc::now()).unwrap();
        store.add(&draft("B2", Status::Trabalhado, false), Utc::now()).unwrap();
        store.export_json().unwrap()
    };
    let backup_path = dir.path().join(chamado_log_core::BACKUP_FILE_NAME);
    std::fs::write(&backup_path, &exported).unwrap();

    let other_dir = TempDir::new().unwrap();
    let mut restored = open(&other_dir);
    let payload = std::fs::read_to_string(&backup_path).unwrap();
    let outcome = restored.import_json(&payload).unwrap();
    assert_eq!(outcome.imported, 2);
    assert_eq!(outcome.skipped, 0);

    let original = open(&dir);
    assert_eq!(restored.tickets(), original.tickets());
}
