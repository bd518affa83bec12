use crate::Result;

/// Blocking id to bytes storage underneath a [`ResultTable`].
///
/// Implementations are called from `spawn_blocking`, never from async code
/// directly.
///
/// [`ResultTable`]: super::ResultTable
pub trait ResultBackend: Send + Sync + 'static {
    fn contains(&self, id: &str) -> Result<bool>;

    /// Looks up every id in one pass. The result is positional: entry `i`
    /// answers `ids[i]`.
    fn bulk_get(&self, ids: &[String]) -> Result<Vec<Option<Vec<u8>>>>;

    /// Inserts or replaces every entry.
    fn bulk_put(&self, entries: Vec<(String, Vec<u8>)>) -> Result<()>;

    fn bulk_delete(&self, ids: &[String]) -> Result<()>;

    fn clear(&self) -> Result<()>;
}
