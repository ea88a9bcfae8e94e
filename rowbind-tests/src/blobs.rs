use rowbind::{Connection, Driver, ErrorKind, ErrorKindExt, RawConnection, ReopenBlob};
use std::sync::Mutex;

static MUTEX: Mutex<()> = Mutex::new(());

pub fn blobs<D: Driver>(connection: &mut Connection<D>)
where
    <D::Raw as RawConnection>::Blob: ReopenBlob,
{
    let _lock = MUTEX.lock().unwrap();

    // Setup
    connection
        .execute("DROP TABLE IF EXISTS blobs")
        .expect("Failed to drop blobs table");
    connection
        .execute("CREATE TABLE blobs (id INTEGER PRIMARY KEY, data BLOB)")
        .expect("Failed to create blobs table");
    connection
        .execute("INSERT INTO blobs (id, data) VALUES (1, zeroblob(8)), (2, x'070707')")
        .expect("Failed to insert into blobs");

    // Write and read back
    let mut blob = connection
        .open_blob("blobs", "data", 1, false)
        .expect("Failed to open the blob");
    assert!(blob.is_open());
    assert_eq!(blob.size(), 8);
    blob.write(&[1, 2, 3], 4).expect("Failed to write the blob");
    let mut buffer = [0; 3];
    blob.read(&mut buffer, 4).expect("Failed to read the blob");
    assert_eq!(buffer, [1, 2, 3]);
    crate::silent_logs! {
        let error = blob.read(&mut [0; 4], 6).unwrap_err();
        assert_eq!(error.kind(), Some(ErrorKind::Io));
        assert_eq!(connection.last_status(), Some(ErrorKind::Io));
    }
    blob.close().expect("Failed to close the blob");
    blob.close().expect("Closing twice is a no-op");
    assert!(!blob.is_open());

    // Visible to queries
    connection
        .prepare("SELECT data FROM blobs WHERE id = 1")
        .unwrap();
    let data = connection.register_blob(8).unwrap();
    assert!(connection.step().unwrap().is_row());
    assert_eq!(
        connection.slot(&data).unwrap().data(),
        &[0, 0, 0, 0, 1, 2, 3, 0]
    );
    connection.clear();

    // Read only, moving between rows
    let mut blob = connection
        .open_blob("blobs", "data", 1, true)
        .expect("Failed to open the blob read only");
    crate::silent_logs! {
        let error = blob.write(&[9], 0).unwrap_err();
        assert_eq!(error.kind(), Some(ErrorKind::Io));
    }
    blob.move_to_row(2).expect("Failed to move the blob");
    assert_eq!(blob.size(), 3);
    blob.read(&mut buffer, 0).unwrap();
    assert_eq!(buffer, [7, 7, 7]);
    crate::silent_logs! {
        let error = blob.move_to_row(99).unwrap_err();
        assert_eq!(error.kind(), Some(ErrorKind::Io));
        let _ = blob.close();
    }
    drop(blob);

    // Missing row
    crate::silent_logs! {
        let error = connection
            .open_blob("blobs", "data", 99, true)
            .err()
            .expect("Opening a missing row should fail");
        assert_eq!(error.kind(), Some(ErrorKind::Io));
    }
}
