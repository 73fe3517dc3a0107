//! Application defaults and the public view of the site.

pub mod defaults;
pub mod public;

pub use defaults::{MAX_FACILITY_CARDS, default_settings, merge_settings, setting_text};
pub use public::{CarouselSlide, FacilityCard, PublicSite, SlideLink, load_public_site, slide_link};
