//! Id lookup over record slices.

use crate::error::{LoadableError, Result};
use dla_format::Record;

/// Find the record with `id`.
///
/// Dense tables (entry `i` has id `i`) resolve in O(1); sparse tables fall
/// back to a scan.
///
/// # Errors
///
/// Returns `NotFound` naming the record's table if no entry has `id`.
pub fn find_record<T: Record>(entries: &[T], id: u16) -> Result<&T> {
    if let Some(entry) = entries.get(usize::from(id)).filter(|e| e.id() == id) {
        return Ok(entry);
    }
    entries
        .iter()
        .find(|e| e.id() == id)
        .ok_or_else(|| LoadableError::not_found(T::TABLE, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dla_format::{AddressListEntry, Table};

    #[test]
    fn dense_and_sparse_lookup() {
        let dense = [AddressListEntry::new(0, 0, 0, 8), AddressListEntry::new(1, 0, 8, 8)];
        assert_eq!(find_record(&dense, 1).unwrap().offset, 8);

        let sparse = [AddressListEntry::new(4, 0, 0, 8), AddressListEntry::new(10, 1, 0, 4)];
        assert_eq!(find_record(&sparse, 10).unwrap().mem_id, 1);
        assert_eq!(
            find_record(&sparse, 5).unwrap_err(),
            LoadableError::NotFound {
                table: Table::Address,
                id: 5
            }
        );
    }
}
