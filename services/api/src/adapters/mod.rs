pub mod admin_store;
pub mod fetcher;
pub mod image_openai;
pub mod printify;
pub mod sleeper;
pub mod stripe;

pub use admin_store::FileAdminStore;
pub use fetcher::HttpImageFetcher;
pub use image_openai::OpenAiImageAdapter;
pub use printify::PrintifyAdapter;
pub use sleeper::TokioSleeper;
pub use stripe::StripeAdapter;
