use indoc::indoc;
use rowbind::{Connection, Driver, Step};
use std::sync::Mutex;

static MUTEX: Mutex<()> = Mutex::new(());

pub fn nulls<D: Driver>(connection: &mut Connection<D>) {
    let _lock = MUTEX.lock().unwrap();

    // Setup
    connection
        .execute("DROP TABLE IF EXISTS nullable")
        .expect("Failed to drop nullable table");
    connection
        .execute("CREATE TABLE nullable (a INTEGER, b INTEGER, c REAL, d TEXT, e TEXT, f BLOB)")
        .expect("Failed to create nullable table");
    connection
        .execute(indoc! {"
            INSERT INTO nullable VALUES
                (1, 2, 3.5, 'four', 'five', x'0606'),
                (NULL, NULL, NULL, NULL, NULL, NULL)
        "})
        .expect("Failed to insert into nullable");

    // Values first, then nulls into the same slots
    connection
        .prepare("SELECT a, b, c, d, e, f FROM nullable ORDER BY a IS NULL")
        .expect("Failed to prepare the select");
    let a = connection.register_int32().unwrap();
    let b = connection.register_int64().unwrap();
    let c = connection.register_double().unwrap();
    let d = connection.register_text(8).unwrap();
    let e = connection.register_string().unwrap();
    let f = connection.register_blob(2).unwrap();
    assert_eq!(connection.step().unwrap(), Step::Row);
    assert!(!connection.is_null(&a));
    assert!(!connection.is_null(&f));
    assert_eq!(connection.slot(&c).unwrap().value(), 3.5);
    assert_eq!(connection.slot(&d).unwrap().to_str(), Ok("four"));
    assert_eq!(connection.slot(&f).unwrap().data(), &[6, 6]);
    assert_eq!(connection.step().unwrap(), Step::Row);
    assert!(connection.is_null(&a));
    assert!(connection.is_null(&b));
    assert!(connection.is_null(&c));
    assert!(connection.is_null(&d));
    assert!(connection.is_null(&e));
    assert!(connection.is_null(&f));
    assert_eq!(connection.slot(&a).unwrap().value(), 0);
    assert_eq!(connection.slot(&b).unwrap().value(), 0);
    assert_eq!(connection.slot(&c).unwrap().value(), 0.0);
    assert_eq!(connection.slot(&d).unwrap().as_bytes(), b"");
    assert_eq!(connection.slot(&e).unwrap().as_bytes(), b"");
    assert_eq!(connection.slot(&f).unwrap().buffer(), &[0, 0]);
    assert_eq!(connection.step().unwrap(), Step::Done);

    // Null parameters
    connection
        .prepare("SELECT count(*) FROM nullable WHERE a IS ?")
        .unwrap();
    connection.bind_null().unwrap();
    let count = connection.register_int32().unwrap();
    assert!(connection.step().unwrap().is_row());
    assert_eq!(connection.slot(&count).unwrap().value(), 1);
    connection.reset().unwrap();
    connection.bind(None::<&str>).unwrap();
    assert!(connection.step().unwrap().is_row());
    assert_eq!(connection.slot(&count).unwrap().value(), 1);
    connection.clear();
}
