pub mod error;

pub mod config;

pub mod logging;
pub use logging::Logger;

pub mod cache {
    pub mod thumbnail_cache;
    pub use thumbnail_cache::{Thumbnail, ThumbnailCache, ThumbnailSlot};
}

pub mod controller {
    pub mod actions;
    pub use actions::Action;

    pub mod event_loop;
    pub use event_loop::{EventLoop, Notification, NotificationLevel, Reply, TaskResult};
}

pub mod fs {
    pub mod category;
    pub use category::FileCategory;

    pub mod dir_lister;

    pub mod entry_info;
    pub use entry_info::{DirectoryEntry, EntryKind};

    pub mod file_ops;
    pub use file_ops::OpReport;

    pub mod permissions;

    pub mod storage;
}

pub mod model {
    pub mod navigation;
    pub use navigation::NavigationState;

    pub mod session;
    pub use session::Session;

    pub mod snapshot;
    pub use snapshot::SessionSnapshot;
}

pub mod tasks {
    pub mod file_ops_task;
    pub use file_ops_task::{FileOpOutcome, FileOperation, FileOperationTask};

    pub mod thumbnail_task;
    pub use thumbnail_task::{ThumbnailGenerator, ThumbnailRequest};
}

pub mod util {
    pub mod humanize;
}

pub mod view {
    pub mod icons;

    pub mod listing;
}

pub use error::AppError;
