use indoc::indoc;
use rowbind::{Connection, Driver, State, Step};
use std::sync::Mutex;

static MUTEX: Mutex<()> = Mutex::new(());

pub fn simple<D: Driver>(connection: &mut Connection<D>) {
    let _lock = MUTEX.lock().unwrap();

    // Setup
    connection
        .execute("DROP TABLE IF EXISTS simple_people")
        .expect("Failed to drop simple_people table");
    connection
        .execute(indoc! {"
            CREATE TABLE simple_people (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                score REAL
            )
        "})
        .expect("Failed to create simple_people table");

    // Insert
    connection
        .prepare("INSERT INTO simple_people (id, name, score) VALUES (?, ?, ?)")
        .expect("Failed to prepare the insert");
    for (id, name, score) in [(1, "alice", 9.5), (2, "bo", 7.25), (3, "charlotte", 8.0)] {
        connection.reset().expect("Failed to reset the insert");
        connection
            .bind(id)
            .and_then(|c| c.bind(name))
            .and_then(|c| c.bind(score))
            .expect("Failed to bind the insert parameters");
        assert_eq!(connection.bind_cursor(), 3);
        assert!(connection.step().expect("Failed to insert").is_done());
        assert_eq!(connection.rows_affected().unwrap(), 1);
    }
    assert_eq!(connection.last_insert_rowid().unwrap(), 3);
    connection.clear();
    assert_eq!(connection.state(), State::Open);

    // Truncated text
    connection
        .prepare("SELECT id, name FROM simple_people WHERE id = ?")
        .expect("Failed to prepare the select by id");
    connection.bind(1).expect("Failed to bind the id");
    let id = connection.register_int32().unwrap();
    let name = connection.register_text(3).unwrap();
    assert_eq!(connection.step().unwrap(), Step::Row);
    assert_eq!(connection.slot(&id).unwrap().value(), 1);
    assert_eq!(connection.slot(&name).unwrap().buffer(), b"al\0");
    assert_eq!(connection.slot(&name).unwrap().to_str(), Ok("al"));
    assert!(connection.is_truncated());
    assert_eq!(connection.returned_length(&name), 5);
    assert_eq!(connection.step().unwrap(), Step::Done);
    assert!(connection.is_truncated());

    // Same parameters again
    assert_eq!(connection.step().unwrap(), Step::Row);
    assert_eq!(connection.slot(&id).unwrap().value(), 1);
    assert_eq!(connection.step().unwrap(), Step::Done);

    // New parameters
    connection.reset().unwrap();
    connection.bind(2).unwrap();
    assert_eq!(connection.step().unwrap(), Step::Row);
    assert_eq!(connection.slot(&id).unwrap().value(), 2);
    assert_eq!(connection.slot(&name).unwrap().to_str(), Ok("bo"));
    assert!(!connection.is_truncated());
    assert_eq!(connection.returned_length(&name), 2);

    // Full scan
    connection
        .prepare("SELECT id, name, score FROM simple_people ORDER BY id")
        .expect("Failed to prepare the full scan");
    let id = connection.register_int64().unwrap();
    let name = connection.register_string().unwrap();
    let score = connection.register_double().unwrap();
    let mut rows = Vec::new();
    while connection.step().expect("Failed to step").is_row() {
        rows.push((
            connection.slot(&id).unwrap().value(),
            connection.slot(&name).unwrap().to_string_lossy().into_owned(),
            connection.slot(&score).unwrap().value(),
        ));
    }
    assert_eq!(
        rows,
        vec![
            (1, "alice".to_string(), 9.5),
            (2, "bo".to_string(), 7.25),
            (3, "charlotte".to_string(), 8.0),
        ]
    );
    assert!(!connection.is_truncated());

    // Fewer slots than columns
    connection
        .prepare("SELECT id, name FROM simple_people WHERE id = 3")
        .unwrap();
    let id = connection.register_int32().unwrap();
    assert_eq!(
        connection.step().unwrap(),
        Step::Mismatch {
            slots: 1,
            columns: 2
        }
    );
    assert_eq!(connection.slot(&id).unwrap().value(), 3);

    // More slots than columns
    connection
        .prepare("SELECT name FROM simple_people WHERE id = 2")
        .unwrap();
    let name = connection.register_string().unwrap();
    let extra = connection.register_int32().unwrap();
    assert_eq!(
        connection.step().unwrap(),
        Step::Mismatch {
            slots: 2,
            columns: 1
        }
    );
    assert_eq!(connection.slot(&name).unwrap().to_str(), Ok("bo"));
    assert_eq!(connection.slot(&extra).unwrap().value(), 0);
    connection.clear();
}
