//! Pure view derivation over the authoritative book collection.
//!
//! Everything here is a function of `(books, search_term, sort_key)`; the
//! result is a fresh snapshot and never aliases the inputs. Derived views are
//! recomputed, never mutated in place.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::model::{Book, Status};

/// Sort key for the filtered collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Title,
    Author,
    Status,
    Year,
    Rating,
}

/// Derived projections of one collection: the filtered+sorted whole, the
/// three status sections (favorites first within each), and the favorites
/// view across statuses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LibraryView {
    pub all: Vec<Book>,
    pub not_read: Vec<Book>,
    pub reading: Vec<Book>,
    pub finished: Vec<Book>,
    pub favorites: Vec<Book>,
}

impl LibraryView {
    /// Run the full derivation: filter, stable sort, partition by status,
    /// stable favorite-first reorder per section, favorites across statuses.
    pub fn derive(books: &[Book], search_term: &str, sort_key: SortKey) -> Self {
        // The raw term is matched as-is; surrounding whitespace is part of
        // the search.
        let needle = search_term.to_lowercase();

        let mut all: Vec<Book> = books
            .iter()
            .filter(|book| matches_search(book, &needle))
            .cloned()
            .collect();
        // Vec::sort_by is stable; ties keep their prior relative order.
        all.sort_by(comparator(sort_key));

        let favorites: Vec<Book> = all.iter().filter(|b| b.is_favorite).cloned().collect();

        Self {
            not_read: section(&all, Status::NotRead),
            reading: section(&all, Status::Reading),
            finished: section(&all, Status::Finished),
            favorites,
            all,
        }
    }
}

/// A book matches when the term is empty or a lower-cased substring of the
/// title, the author, or the decimal form of the publication year.
fn matches_search(book: &Book, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    book.title.to_lowercase().contains(needle)
        || book.author.to_lowercase().contains(needle)
        || book
            .publication_year
            .is_some_and(|year| year.to_string().contains(needle))
}

/// Comparator table for the sort step. Title/author compare case-insensitively
/// ascending, status by its wire string, year and rating descending with
/// missing values treated as 0.
fn comparator(key: SortKey) -> impl FnMut(&Book, &Book) -> Ordering {
    move |a, b| match key {
        SortKey::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        SortKey::Author => a.author.to_lowercase().cmp(&b.author.to_lowercase()),
        SortKey::Status => a.status.as_str().cmp(b.status.as_str()),
        SortKey::Year => b
            .publication_year
            .unwrap_or(0)
            .cmp(&a.publication_year.unwrap_or(0)),
        SortKey::Rating => b.rating.unwrap_or(0).cmp(&a.rating.unwrap_or(0)),
    }
}

/// One status section: books of that status in sorted order, stably
/// partitioned so favorites come first without reordering within either class.
fn section(sorted: &[Book], status: Status) -> Vec<Book> {
    let mut favorites = Vec::new();
    let mut rest = Vec::new();
    for book in sorted.iter().filter(|b| b.status == status) {
        if book.is_favorite {
            favorites.push(book.clone());
        } else {
            rest.push(book.clone());
        }
    }
    favorites.extend(rest);
    favorites
}

/// Headline counts over the authoritative (unfiltered) collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LibraryStats {
    pub total: usize,
    pub not_read: usize,
    pub reading: usize,
    pub finished: usize,
    pub favorites: usize,
}

impl LibraryStats {
    pub fn of(books: &[Book]) -> Self {
        let mut stats = Self {
            total: books.len(),
            ..Self::default()
        };
        for book in books {
            match book.status {
                Status::NotRead => stats.not_read += 1,
                Status::Reading => stats.reading += 1,
                Status::Finished => stats.finished += 1,
            }
            if book.is_favorite {
                stats.favorites += 1;
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use time::OffsetDateTime;

    fn book(id: &str, title: &str, author: &str) -> Book {
        Book {
            id: id.into(),
            title: title.into(),
            author: author.into(),
            status: Status::NotRead,
            publication_year: None,
            rating: None,
            is_favorite: false,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn fixture() -> Vec<Book> {
        vec![
            Book {
                status: Status::Reading,
                publication_year: Some(1965),
                rating: Some(5),
                is_favorite: true,
                ..book("b1", "Dune", "Frank Herbert")
            },
            Book {
                status: Status::Finished,
                publication_year: Some(2001),
                rating: Some(4),
                ..book("b2", "American Gods", "Neil Gaiman")
            },
            Book {
                publication_year: Some(2020),
                ..book("b3", "Piranesi", "Susanna Clarke")
            },
            Book {
                is_favorite: true,
                ..book("b4", "Annihilation", "Jeff VanderMeer")
            },
            Book {
                status: Status::Reading,
                rating: Some(3),
                ..book("b5", "The Fifth Season", "N. K. Jemisin")
            },
        ]
    }

    fn ids(books: &[Book]) -> Vec<&str> {
        books.iter().map(|b| b.id.as_str()).collect()
    }

    #[test]
    fn sorted_view_preserves_the_filtered_id_set() {
        let books = fixture();
        for key in [
            SortKey::Title,
            SortKey::Author,
            SortKey::Status,
            SortKey::Year,
            SortKey::Rating,
        ] {
            let view = LibraryView::derive(&books, "", key);
            let expected: HashSet<&str> = books.iter().map(|b| b.id.as_str()).collect();
            let actual: HashSet<&str> = view.all.iter().map(|b| b.id.as_str()).collect();
            assert_eq!(actual, expected);
            assert_eq!(view.all.len(), books.len(), "no duplication");
        }
    }

    #[test]
    fn status_sections_partition_the_sorted_view() {
        let books = fixture();
        let view = LibraryView::derive(&books, "", SortKey::Title);

        let mut union: Vec<&str> = Vec::new();
        union.extend(ids(&view.not_read));
        union.extend(ids(&view.reading));
        union.extend(ids(&view.finished));

        let all: HashSet<&str> = view.all.iter().map(|b| b.id.as_str()).collect();
        let union_set: HashSet<&str> = union.iter().copied().collect();
        assert_eq!(union_set, all);
        assert_eq!(union.len(), union_set.len(), "sections are disjoint");
    }

    #[test]
    fn favorites_lead_each_section_without_internal_reorder() {
        let mut books = fixture();
        // Two favorites and two non-favorites in the same section, with titles
        // that interleave them under title sort.
        books.push(Book {
            is_favorite: true,
            ..book("b6", "Zone One", "Colson Whitehead")
        });
        let view = LibraryView::derive(&books, "", SortKey::Title);

        // not-read contains b4 (fav), b3, b6 (fav); favorites must lead in
        // sorted order, then the rest in sorted order.
        assert_eq!(ids(&view.not_read), vec!["b4", "b6", "b3"]);

        // The section's favorite prefix equals the favorites view restricted
        // to that status.
        let favorite_prefix: Vec<&str> = view
            .not_read
            .iter()
            .take_while(|b| b.is_favorite)
            .map(|b| b.id.as_str())
            .collect();
        let from_favorites: Vec<&str> = view
            .favorites
            .iter()
            .filter(|b| b.status == Status::NotRead)
            .map(|b| b.id.as_str())
            .collect();
        assert_eq!(favorite_prefix, from_favorites);
    }

    #[test]
    fn favorites_view_spans_statuses_in_sorted_order() {
        let books = fixture();
        let view = LibraryView::derive(&books, "", SortKey::Title);
        assert_eq!(ids(&view.favorites), vec!["b4", "b1"]);
    }

    #[test]
    fn year_sort_is_descending_with_missing_last() {
        let books = vec![
            Book {
                publication_year: Some(2001),
                ..book("y1", "A", "a")
            },
            Book {
                publication_year: None,
                ..book("y2", "B", "b")
            },
            Book {
                publication_year: Some(1999),
                ..book("y3", "C", "c")
            },
        ];
        let view = LibraryView::derive(&books, "", SortKey::Year);
        assert_eq!(ids(&view.all), vec!["y1", "y3", "y2"]);
    }

    #[test]
    fn rating_sort_is_descending_with_missing_as_zero() {
        let books = fixture();
        let view = LibraryView::derive(&books, "", SortKey::Rating);
        assert_eq!(ids(&view.all), vec!["b1", "b2", "b5", "b3", "b4"]);
    }

    #[test]
    fn status_sort_uses_wire_string_order() {
        let books = fixture();
        let view = LibraryView::derive(&books, "", SortKey::Status);
        // "finished" < "not-read" < "reading"; ties keep insertion order.
        assert_eq!(ids(&view.all), vec!["b2", "b3", "b4", "b1", "b5"]);
    }

    #[test]
    fn search_matches_publication_year() {
        let books = fixture();
        let view = LibraryView::derive(&books, "2020", SortKey::Title);
        assert_eq!(ids(&view.all), vec!["b3"]);
    }

    #[test]
    fn search_is_case_insensitive_over_title_and_author() {
        let books = fixture();
        let by_title = LibraryView::derive(&books, "dUnE", SortKey::Title);
        assert_eq!(ids(&by_title.all), vec!["b1"]);
        let by_author = LibraryView::derive(&books, "gaiman", SortKey::Title);
        assert_eq!(ids(&by_author.all), vec!["b2"]);
    }

    #[test]
    fn empty_search_retains_everything() {
        let books = fixture();
        let view = LibraryView::derive(&books, "", SortKey::Title);
        assert_eq!(view.all.len(), books.len());
    }

    #[test]
    fn search_whitespace_is_significant() {
        let books = fixture();
        // A leading space is part of the term and matches inside titles.
        let view = LibraryView::derive(&books, " gods", SortKey::Title);
        assert_eq!(ids(&view.all), vec!["b2"]);
        // A trailing space rules out a title that ends at the word.
        let view = LibraryView::derive(&books, "dune ", SortKey::Title);
        assert!(view.all.is_empty());
    }

    #[test]
    fn stats_count_sections_and_favorites() {
        let stats = LibraryStats::of(&fixture());
        assert_eq!(
            stats,
            LibraryStats {
                total: 5,
                not_read: 2,
                reading: 2,
                finished: 1,
                favorites: 2,
            }
        );
    }
}
