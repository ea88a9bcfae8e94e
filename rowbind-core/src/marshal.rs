use crate::{Column, RawStatement, Receive, ResultSlot};

/// Summary of one marshaled row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Marshaled {
    pub(crate) columns: usize,
    pub(crate) truncated: bool,
}

/// Walk the slots against the columns of the current row.
///
/// Only the overlap is marshaled, slots past the last column keep their previous content.
pub(crate) fn marshal_row<S: RawStatement + ?Sized>(
    slots: &mut [ResultSlot],
    statement: &mut S,
) -> Marshaled {
    let columns = statement.column_count();
    let mut truncated = false;
    for (index, slot) in slots.iter_mut().take(columns).enumerate() {
        let received = slot.receive(Column::new(statement, index));
        truncated |= received.truncated;
    }
    Marshaled { columns, truncated }
}
