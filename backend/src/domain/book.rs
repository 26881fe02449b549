//! Book aggregate and its pages.
//!
//! A [`Book`] owns the ordered membership list of its pages; the [`Page`]
//! documents themselves are stored separately and carry no back-reference.
//! Text fields are validated newtypes so a handler cannot construct an
//! over-long title by accident.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{BookId, PageId, UserId};
use super::media::CoverAssetId;

/// Validation errors raised by book and page text fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FieldValidationError {
    /// A required field was missing or blank.
    #[error("{field} must not be empty")]
    Blank {
        /// Payload field name.
        field: &'static str,
    },
    /// The field exceeded its length limit.
    #[error("{field} must be at most {max} characters")]
    TooLong {
        /// Payload field name.
        field: &'static str,
        /// Upper bound in characters.
        max: usize,
    },
}

impl FieldValidationError {
    /// Name of the payload field the error refers to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::Blank { field } | Self::TooLong { field, .. } => field,
        }
    }
}

macro_rules! define_text_field {
    ($(#[$meta:meta])* $name:ident, field = $field:literal, allow_empty = $allow_empty:literal, trim = $trim:literal, max = $max:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Maximum length in characters.
            pub const MAX: usize = $max;

            /// Validate and construct the field from raw input.
            ///
            /// Blank and length checks ignore surrounding whitespace.
            pub fn new(raw: impl AsRef<str>) -> Result<Self, FieldValidationError> {
                let trimmed = raw.as_ref().trim();
                if trimmed.is_empty() && !$allow_empty {
                    return Err(FieldValidationError::Blank { field: $field });
                }
                if trimmed.chars().count() > Self::MAX {
                    return Err(FieldValidationError::TooLong {
                        field: $field,
                        max: Self::MAX,
                    });
                }
                let stored = if $trim { trimmed } else { raw.as_ref() };
                Ok(Self(stored.to_owned()))
            }

            /// Parse an optional patch value; absent or blank input means
            /// "leave unchanged".
            pub fn patch(raw: Option<&str>) -> Result<Option<Self>, FieldValidationError> {
                match raw {
                    Some(value) if !value.trim().is_empty() => Self::new(value).map(Some),
                    _ => Ok(None),
                }
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.0.as_str()
            }
        }

        impl TryFrom<String> for $name {
            type Error = FieldValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

define_text_field!(
    /// Book title, 1 to 200 characters.
    BookTitle, field = "title", allow_empty = false, trim = true, max = 200
);
define_text_field!(
    /// Book description, 1 to 2000 characters.
    BookDescription, field = "description", allow_empty = false, trim = true, max = 2000
);
define_text_field!(
    /// Page title, 1 to 200 characters.
    PageTitle, field = "title", allow_empty = false, trim = true, max = 200
);
define_text_field!(
    /// Page body; may be empty, at most 100 000 characters. Stored verbatim.
    PageContent, field = "content", allow_empty = true, trim = false, max = 100_000
);

/// Book document.
///
/// ## Invariants
/// - `author` is fixed at creation.
/// - Every id in `pages` refers to a stored [`Page`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Stable identifier.
    pub id: BookId,
    /// Title.
    pub title: BookTitle,
    /// Description.
    pub description: BookDescription,
    /// Current cover asset, if any.
    pub cover: Option<CoverAssetId>,
    /// Creator and sole mutator.
    pub author: UserId,
    /// Page membership in reading order.
    pub pages: Vec<PageId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Create a fresh book for `author` with no pages.
    #[must_use]
    pub fn create(draft: BookDraft, author: UserId, now: DateTime<Utc>) -> Self {
        let BookDraft {
            title,
            description,
            cover,
        } = draft;
        Self {
            id: BookId::random(),
            title,
            description,
            cover,
            author,
            pages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `user` may mutate this book.
    #[must_use]
    pub fn is_authored_by(&self, user: &UserId) -> bool {
        self.author == *user
    }

    /// Whether `page` belongs to this book.
    #[must_use]
    pub fn contains_page(&self, page: &PageId) -> bool {
        self.pages.contains(page)
    }
}

/// Page document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// Stable identifier.
    pub id: PageId,
    /// Title.
    pub title: PageTitle,
    /// Body text.
    pub content: PageContent,
    /// Current cover asset, if any.
    pub cover: Option<CoverAssetId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Page {
    /// Create a fresh page with a generated id.
    #[must_use]
    pub fn create(draft: PageDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: PageId::random(),
            title: draft.title,
            content: draft.content,
            cover: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Validated input for creating a book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookDraft {
    /// Title.
    pub title: BookTitle,
    /// Description.
    pub description: BookDescription,
    /// Optional pre-uploaded cover asset.
    pub cover: Option<CoverAssetId>,
}

impl BookDraft {
    /// Validate raw inputs.
    pub fn try_from_parts(
        title: &str,
        description: &str,
        cover: Option<&str>,
    ) -> Result<Self, FieldValidationError> {
        Ok(Self {
            title: BookTitle::new(title)?,
            description: BookDescription::new(description)?,
            cover: cover.and_then(CoverAssetId::new),
        })
    }
}

/// Validated input for adding a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDraft {
    /// Title.
    pub title: PageTitle,
    /// Body text.
    pub content: PageContent,
}

impl PageDraft {
    /// Validate raw inputs. Missing content is treated as empty.
    pub fn try_from_parts(title: &str, content: Option<&str>) -> Result<Self, FieldValidationError> {
        Ok(Self {
            title: PageTitle::new(title)?,
            content: PageContent::new(content.unwrap_or_default())?,
        })
    }
}

/// Partial book update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookPatch {
    /// Replacement title.
    pub title: Option<BookTitle>,
    /// Replacement description.
    pub description: Option<BookDescription>,
}

impl BookPatch {
    /// Validate raw inputs; blank values mean "no change".
    pub fn try_from_parts(
        title: Option<&str>,
        description: Option<&str>,
    ) -> Result<Self, FieldValidationError> {
        Ok(Self {
            title: BookTitle::patch(title)?,
            description: BookDescription::patch(description)?,
        })
    }
}

/// Partial page update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PagePatch {
    /// Replacement title.
    pub title: Option<PageTitle>,
    /// Replacement body text.
    pub content: Option<PageContent>,
}

impl PagePatch {
    /// Validate raw inputs; blank values mean "no change".
    pub fn try_from_parts(
        title: Option<&str>,
        content: Option<&str>,
    ) -> Result<Self, FieldValidationError> {
        Ok(Self {
            title: PageTitle::patch(title)?,
            content: PageContent::patch(content)?,
        })
    }
}

/// Document whose cover is being replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverTarget {
    /// The book's own cover.
    Book(BookId),
    /// Cover of a page belonging to `book`.
    Page {
        /// Owning book, used for the ownership check.
        book: BookId,
        /// Page whose cover changes.
        page: PageId,
    },
}

impl CoverTarget {
    /// Book whose author is allowed to change the cover.
    #[must_use]
    pub const fn book(&self) -> &BookId {
        match self {
            Self::Book(book) | Self::Page { book, .. } => book,
        }
    }
}
