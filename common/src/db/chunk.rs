use itertools::{IntoChunks, Itertools};
use sea_orm::{ActiveModelTrait, EntityTrait, Iterable};

/// Drivers cap the number of bind parameters in a single statement at
/// `u16::MAX`; a few slots are reserved for the conflict clause.
const BIND_BUDGET: usize = u16::MAX as usize - 8;

pub trait EntityChunkedIter: Sized {
    type Item: ActiveModelTrait;

    /// Split a stream of active models into chunks which fit the bind
    /// parameter budget of a single `INSERT` statement.
    fn chunked(self) -> IntoChunks<impl Iterator<Item = Self::Item>>;
}

impl<T> EntityChunkedIter for T
where
    T: IntoIterator,
    <T as IntoIterator>::Item: ActiveModelTrait,
{
    type Item = T::Item;

    fn chunked(self) -> IntoChunks<impl Iterator<Item = Self::Item>> {
        let columns = <<T::Item as ActiveModelTrait>::Entity as EntityTrait>::Column::iter().count();
        self.into_iter().chunks(BIND_BUDGET / columns)
    }
}
