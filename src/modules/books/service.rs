use std::sync::Arc;

use bookshelf_store::DocumentStore;
use tokio::sync::{Mutex, MutexGuard};

use super::error::BookError;
use super::models::{Book, BookId, BookPatch, CreateBook, Library, ListQuery};

/// Listing, creation, partial update and deletion over a single stored
/// [`Library`] document.
///
/// Every call loads the whole document. Mutations write the whole document
/// back. With `serialize_writes` off, concurrent mutations race and the last
/// writer wins.
pub struct BookService {
    store: Arc<dyn DocumentStore<Library>>,
    write_lock: Option<Mutex<()>>,
}

impl BookService {
    pub fn new(store: Arc<dyn DocumentStore<Library>>, serialize_writes: bool) -> Self {
        Self {
            store,
            write_lock: serialize_writes.then(|| Mutex::new(())),
        }
    }

    /// Books matching every filter, sliced to the requested page.
    pub async fn list(&self, query: &ListQuery) -> Result<Vec<Book>, BookError> {
        let library = self.store.load().await?;

        let books: Vec<Book> = library
            .books
            .into_iter()
            .filter(|book| query.matches(book))
            .skip(query.offset())
            .take(query.limit)
            .collect();

        tracing::debug!(
            page = query.page,
            limit = query.limit,
            filters = query.filters.len(),
            count = books.len(),
            "listed books"
        );
        Ok(books)
    }

    /// Append a new book under a freshly generated id.
    pub async fn create(&self, new_book: CreateBook) -> Result<Book, BookError> {
        let _guard = self.exclusive().await;
        let mut library = self.store.load().await?;

        let mut id = BookId::generate();
        while library.contains(&id) {
            id = BookId::generate();
        }

        let book = new_book.into_book(id);
        library.books.push(book.clone());
        self.store.save(&library).await?;

        tracing::info!(book_id = %book.id, count = library.books.len(), "book created");
        Ok(book)
    }

    /// Merge `patch` into the book with `id`, keeping its position.
    pub async fn update(&self, id: &BookId, patch: BookPatch) -> Result<Book, BookError> {
        let _guard = self.exclusive().await;
        let mut library = self.store.load().await?;

        let index = library
            .position(id)
            .ok_or_else(|| BookError::NotFound(id.clone()))?;
        library.books[index].apply(patch);
        let updated = library.books[index].clone();

        self.store.save(&library).await?;

        tracing::info!(book_id = %id, "book updated");
        Ok(updated)
    }

    /// Remove the book with `id`; the remaining books keep their order.
    pub async fn delete(&self, id: &BookId) -> Result<(), BookError> {
        let _guard = self.exclusive().await;
        let mut library = self.store.load().await?;

        if !library.contains(id) {
            return Err(BookError::NotFound(id.clone()));
        }
        library.books.retain(|book| &book.id != id);

        self.store.save(&library).await?;

        tracing::info!(book_id = %id, count = library.books.len(), "book deleted");
        Ok(())
    }

    async fn exclusive(&self) -> Option<MutexGuard<'_, ()>> {
        match &self.write_lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        }
    }
}
