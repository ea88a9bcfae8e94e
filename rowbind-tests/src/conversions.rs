use indoc::indoc;
use rowbind::{Connection, Driver, ErrorKind, ErrorKindExt, Step};
use rust_decimal::Decimal;
use std::sync::Mutex;
use time::macros::{date, time};
use uuid::Uuid;

static MUTEX: Mutex<()> = Mutex::new(());

pub fn conversions<D: Driver>(connection: &mut Connection<D>) {
    let _lock = MUTEX.lock().unwrap();

    // Setup
    connection
        .execute("DROP TABLE IF EXISTS conversions")
        .expect("Failed to drop conversions table");
    connection
        .execute(indoc! {"
            CREATE TABLE conversions (
                uuid TEXT,
                day TEXT,
                moment TEXT,
                amount REAL,
                flag INTEGER,
                missing INTEGER,
                data BLOB
            )
        "})
        .expect("Failed to create conversions table");

    // Insert
    let uuid = Uuid::parse_str("5e915574-bb30-4430-98cf-c5854f61fbbd").unwrap();
    connection
        .prepare("INSERT INTO conversions VALUES (?, ?, ?, ?, ?, ?, ?)")
        .expect("Failed to prepare the insert");
    crate::silent_logs! {
        let error = connection.bind(u64::MAX).unwrap_err();
        assert_eq!(error.kind(), Some(ErrorKind::Bind));
    }
    assert_eq!(connection.bind_cursor(), 0);
    connection
        .bind(&uuid)
        .and_then(|c| c.bind(date!(2024 - 02 - 29)))
        .and_then(|c| c.bind(time!(12:00:10)))
        .and_then(|c| c.bind(Decimal::new(15, 1)))
        .and_then(|c| c.bind(true))
        .and_then(|c| c.bind(None::<i32>))
        .and_then(|c| c.bind(&[1u8, 2, 3][..]))
        .expect("Failed to bind the insert parameters");
    assert_eq!(connection.bind_cursor(), 7);
    assert!(connection.step().expect("Failed to insert").is_done());

    // Select
    connection
        .prepare("SELECT uuid, day, moment, amount, flag, missing, data FROM conversions")
        .expect("Failed to prepare the select");
    let uuid_slot = connection.register_string().unwrap();
    let day = connection.register_text(11).unwrap();
    let moment = connection.register_string().unwrap();
    let amount = connection.register_double().unwrap();
    let flag = connection.register_int32().unwrap();
    let missing = connection.register_int64().unwrap();
    let data = connection.register_blob(8).unwrap();
    assert_eq!(connection.step().unwrap(), Step::Row);
    assert_eq!(
        connection.slot(&uuid_slot).unwrap().to_str(),
        Ok(uuid.to_string().as_str())
    );
    assert_eq!(connection.slot(&day).unwrap().to_str(), Ok("2024-02-29"));
    assert_eq!(connection.slot(&moment).unwrap().to_str(), Ok("12:00:10.0"));
    assert_eq!(connection.slot(&amount).unwrap().value(), 1.5);
    assert_eq!(connection.slot(&flag).unwrap().value(), 1);
    assert!(connection.is_null(&missing));
    assert_eq!(connection.slot(&missing).unwrap().value(), 0);
    assert_eq!(connection.slot(&data).unwrap().data(), &[1, 2, 3]);
    assert_eq!(connection.returned_length(&data), 3);
    assert!(!connection.is_truncated());

    // Engine coercions
    connection
        .prepare("SELECT 42, '17', 2.5, 'abc'")
        .expect("Failed to prepare the literals");
    let number = connection.register_text(8).unwrap();
    let text = connection.register_int32().unwrap();
    let real = connection.register_string().unwrap();
    let word = connection.register_double().unwrap();
    assert_eq!(connection.step().unwrap(), Step::Row);
    assert_eq!(connection.slot(&number).unwrap().to_str(), Ok("42"));
    assert_eq!(connection.returned_length(&number), 2);
    assert_eq!(connection.slot(&text).unwrap().value(), 17);
    assert_eq!(connection.slot(&real).unwrap().to_str(), Ok("2.5"));
    assert_eq!(connection.slot(&word).unwrap().value(), 0.0);
    assert!(!connection.is_null(&word));

    // Text that is not valid UTF-8
    connection
        .prepare("SELECT CAST(x'ff61' AS TEXT)")
        .expect("Failed to prepare the cast");
    let raw = connection.register_string().unwrap();
    assert_eq!(connection.step().unwrap(), Step::Row);
    assert_eq!(connection.slot(&raw).unwrap().as_bytes(), &[0xff, 0x61]);
    assert!(connection.slot(&raw).unwrap().to_str().is_err());
    assert_eq!(connection.slot(&raw).unwrap().to_string_lossy(), "\u{fffd}a");
    assert_eq!(connection.returned_length(&raw), 2);
    connection.clear();
}
