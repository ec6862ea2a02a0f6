pub mod asset_repo;

pub use asset_repo::AssetRepo;
