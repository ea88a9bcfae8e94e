use rowbind::{Connection, Driver, ErrorKind, ErrorKindExt, State, Step};
use std::sync::Mutex;

static MUTEX: Mutex<()> = Mutex::new(());

pub fn errors<D: Driver>(connection: &mut Connection<D>) {
    let _lock = MUTEX.lock().unwrap();

    // Setup
    connection
        .execute("DROP TABLE IF EXISTS unique_keys")
        .expect("Failed to drop unique_keys table");
    connection
        .execute("CREATE TABLE unique_keys (id INTEGER PRIMARY KEY)")
        .expect("Failed to create unique_keys table");
    connection
        .execute("INSERT INTO unique_keys VALUES (1)")
        .expect("Failed to insert into unique_keys");

    crate::silent_logs! {
        // Malformed query
        let error = connection.prepare("SELEC 1").unwrap_err();
        assert_eq!(error.kind(), Some(ErrorKind::Prepare));
        assert_eq!(connection.state(), State::Open);
        assert_eq!(connection.last_status(), Some(ErrorKind::Prepare));
        assert!(connection.last_error().contains("syntax error"));

        // Multiple statements
        let error = connection.prepare("SELECT 1; SELECT 2").unwrap_err();
        assert_eq!(error.kind(), Some(ErrorKind::Prepare));
        assert_eq!(
            connection.last_error(),
            "Cannot prepare more than one statement at a time"
        );
        connection
            .prepare("SELECT 1;  \n\t")
            .expect("A trailing semicolon is still one statement");
        assert_eq!(connection.last_status(), None);
        connection
            .prepare("SELECT 1; -- trailing comment")
            .expect("A trailing line comment is still one statement");
        connection
            .prepare("SELECT 1 /* note */ ; /* another */")
            .expect("Trailing block comments are still one statement");
        let one = connection.register_int32().unwrap();
        assert_eq!(connection.step().unwrap(), Step::Row);
        assert_eq!(connection.slot(&one).unwrap().value(), 1);
        let error = connection
            .prepare("SELECT 1; -- comment\nSELECT 2")
            .unwrap_err();
        assert_eq!(error.kind(), Some(ErrorKind::Prepare));
        assert_eq!(
            connection.last_error(),
            "Cannot prepare more than one statement at a time"
        );

        // Parameter out of range
        connection.prepare("SELECT ?").unwrap();
        connection.bind(1).unwrap();
        let error = connection.bind(2).unwrap_err();
        assert_eq!(error.kind(), Some(ErrorKind::Bind));
        assert_eq!(connection.bind_cursor(), 1);

        // Constraint violation
        connection
            .prepare("INSERT INTO unique_keys VALUES (?)")
            .unwrap();
        connection.bind(1).unwrap();
        let error = connection.step().unwrap_err();
        assert_eq!(error.kind(), Some(ErrorKind::Engine));
        assert!(!error.is_busy());
        assert_eq!(connection.state(), State::Error);
        assert!(connection.last_error().contains("UNIQUE constraint failed"));
        connection.reset().unwrap();
        connection.bind(2).unwrap();
        assert!(connection.step().unwrap().is_done());

        // Wrong state
        connection.clear();
        assert_eq!(connection.step().unwrap_err().kind(), Some(ErrorKind::InvalidState));
        assert_eq!(
            connection.register_int32().unwrap_err().kind(),
            Some(ErrorKind::InvalidState)
        );
        assert_eq!(connection.last_status(), Some(ErrorKind::InvalidState));

        // Stale handle
        connection.prepare("SELECT 1").unwrap();
        let one = connection.register_int32().unwrap();
        connection.prepare("SELECT 2").unwrap();
        assert_eq!(
            connection.slot(&one).unwrap_err().kind(),
            Some(ErrorKind::InvalidState)
        );

        // Execute
        let error = connection.execute("DROP TABLE no_such_table").unwrap_err();
        assert_eq!(error.kind(), Some(ErrorKind::Prepare));
        assert!(connection.last_error().contains("no such table"));
        let error = connection.execute("INSERT INTO unique_keys VALUES (2)").unwrap_err();
        assert_eq!(error.kind(), Some(ErrorKind::Engine));
        assert_eq!(connection.state(), State::Open);
    }
    connection.clear();
}
