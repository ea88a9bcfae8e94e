use rowbind::{Connection, Driver, State};
use std::sync::Mutex;

static MUTEX: Mutex<()> = Mutex::new(());

pub fn maintenance<D: Driver>(connection: &mut Connection<D>) {
    let _lock = MUTEX.lock().unwrap();

    // Setup
    connection
        .execute("DROP TABLE IF EXISTS maintained")
        .expect("Failed to drop maintained table");
    assert!(!connection.is_table("maintained").unwrap());
    connection
        .execute("CREATE TABLE maintained (id INTEGER PRIMARY KEY)")
        .expect("Failed to create maintained table");
    assert!(connection.is_table("maintained").unwrap());
    assert_eq!(connection.state(), State::Open);

    // Engine metadata
    connection
        .execute("INSERT INTO maintained VALUES (10), (20)")
        .unwrap();
    assert_eq!(connection.rows_affected().unwrap(), 2);
    assert_eq!(connection.last_insert_rowid().unwrap(), 20);

    // Pragmas
    assert!(!connection.journal_mode(None).unwrap().is_empty());
    assert_eq!(connection.locking_mode(None).unwrap(), "normal");
    assert_eq!(connection.pragma("user_version", Some("7")).unwrap(), "");
    assert_eq!(connection.pragma("user_version", None).unwrap(), "7");

    // Checks
    assert!(connection.integrity_check().unwrap());
    assert!(connection.quick_check().unwrap());
    connection.vacuum().expect("Failed to vacuum");
    assert!(connection.is_table("maintained").unwrap());
    assert_eq!(connection.state(), State::Open);
}
