pub mod user_repo;
pub use user_repo::UserRepository;
pub mod lead_repo;
pub use lead_repo::LeadRepository;
pub mod task_repo;
pub use task_repo::TaskRepository;
pub mod history_repo;
pub use history_repo::HistoryRepository;
