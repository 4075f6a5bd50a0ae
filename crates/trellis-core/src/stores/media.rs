use chrono::NaiveDate;

use crate::models::{MediaItem, RowId};

const STARTER_ITEMS: [(&str, &str, &str, (i32, u32, u32)); 2] = [
    (
        "1",
        "mountain.jpg",
        "https://images.unsplash.com/photo-1506744038136-46273834b3fb?auto=format&fit=facearea&w=256&q=80",
        (2024, 3, 20),
    ),
    (
        "2",
        "beach.png",
        "https://images.unsplash.com/photo-1465101046530-73398c7f28ca?auto=format&fit=facearea&w=256&q=80",
        (2024, 3, 19),
    ),
];

/// Media shelf. Items live in memory only; nothing is uploaded.
#[derive(Debug, Clone, Default)]
pub struct MediaStore {
    items: Vec<MediaItem>,
}

impl MediaStore {
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub const fn with_items(items: Vec<MediaItem>) -> Self {
        Self { items }
    }

    /// A shelf holding the two starter images a fresh profile begins with.
    pub fn seeded() -> Self {
        let items = STARTER_ITEMS
            .iter()
            .filter_map(|(id, name, url, (year, month, day))| {
                Some(MediaItem {
                    id: RowId::from(*id),
                    name: (*name).to_string(),
                    url: (*url).to_string(),
                    date: NaiveDate::from_ymd_opt(*year, *month, *day)?,
                })
            })
            .collect();
        Self::with_items(items)
    }

    /// One past the largest numeric id on the shelf.
    pub fn next_id(&self) -> RowId {
        let next = self
            .items
            .iter()
            .filter_map(|item| item.id.as_str().parse::<u64>().ok())
            .max()
            .map_or(1, |max| max + 1);
        RowId::from(next.to_string())
    }

    pub fn add_media(&mut self, item: MediaItem) {
        self.items.push(item);
    }

    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    pub fn find(&self, id: &RowId) -> Option<&MediaItem> {
        self.items.iter().find(|item| &item.id == id)
    }
}
