mod repository;

pub use repository::ProgressRepository;
