//! Restriction evaluation against the catalog and the clock.
//!
//! ## Evaluation Order
//!
//! 1. Disabled feature or a time outside the restriction: sale permitted,
//!    the catalog is never consulted
//! 2. The product's categories are scanned in catalog order and the first
//!    restricted one decides
//! 3. No restricted category: sale permitted
//!
//! Lookup failures fail open. The `try_*` methods expose the underlying
//! `Result`; the plain methods log the error and answer "permitted" or
//! "no message".

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::cart::Cart;
use crate::catalog::{Catalog, Category, ProductId};
use crate::config::RestrictionConfig;
use crate::error::{LookupError, Result};
use crate::notice::{NotificationSink, Severity};
use crate::template::{format_template, ContentFilter, PassThrough};
use crate::time_window::{Clock, LocalClock, RestrictionWindow, TimeOfDay};

/// Decides whether products and categories may be sold right now.
pub struct RestrictionEvaluator {
    config: RestrictionConfig,
    window: Option<RestrictionWindow>,
    catalog: Arc<dyn Catalog>,
    clock: Arc<dyn Clock>,
    filter: Arc<dyn ContentFilter>,
}

impl RestrictionEvaluator {
    /// Creates an evaluator on the host clock with no content filter.
    ///
    /// An invalid configuration is accepted but leaves the evaluator disabled.
    pub fn new(config: RestrictionConfig, catalog: Arc<dyn Catalog>) -> Self {
        let (config, window) = config.into_effective();
        Self {
            config,
            window,
            catalog,
            clock: Arc::new(LocalClock),
            filter: Arc::new(PassThrough),
        }
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the filter applied to rendered warnings.
    pub fn with_content_filter(mut self, filter: Arc<dyn ContentFilter>) -> Self {
        self.filter = filter;
        self
    }

    /// The effective configuration (with `enabled` forced off if invalid).
    pub fn config(&self) -> &RestrictionConfig {
        &self.config
    }

    /// The parsed window, if the configuration was valid.
    pub fn window(&self) -> Option<RestrictionWindow> {
        self.window
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn catalog(&self) -> &dyn Catalog {
        self.catalog.as_ref()
    }

    pub fn current_time(&self) -> TimeOfDay {
        self.clock.current_time()
    }

    // === Window ===

    /// Returns true if a restricted product may be sold at `now`.
    pub fn sale_permitted_at(&self, now: TimeOfDay) -> bool {
        if !self.config.enabled {
            return true;
        }
        match self.window {
            Some(window) => window.permits_sale(now),
            None => true,
        }
    }

    /// Returns true if a restricted product may be sold at the clock's time.
    pub fn sale_permitted_now(&self) -> bool {
        // Skip the clock entirely while disabled.
        !self.config.enabled || self.sale_permitted_at(self.clock.current_time())
    }

    // === Categories ===

    pub fn is_restricted_category(&self, slug: &str) -> bool {
        self.config.is_restricted_category(slug)
    }

    /// Returns the first slug, in the order given, that is restricted.
    pub fn first_restricted_category<'a, I>(&self, slugs: I) -> Option<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        slugs.into_iter().find(|slug| self.is_restricted_category(slug))
    }

    /// Resolves a product's first restricted category through the catalog.
    pub fn restricted_category_for_product(
        &self,
        product_id: ProductId,
    ) -> std::result::Result<Option<String>, LookupError> {
        let categories = self.catalog.categories_for_product(product_id)?;
        Ok(self
            .first_restricted_category(categories.iter().map(|c| c.slug.as_str()))
            .map(str::to_string))
    }

    // === Products ===

    /// Validates a product, surfacing lookup errors.
    pub fn try_validate_product(
        &self,
        product_id: ProductId,
        notify: bool,
        sink: &dyn NotificationSink,
    ) -> Result<bool> {
        if self.sale_permitted_now() {
            return Ok(true);
        }

        let Some(slug) = self.restricted_category_for_product(product_id)? else {
            return Ok(true);
        };

        debug!(product_id, category = %slug, "Product restricted");
        if notify {
            if let Some(message) = self.build_warning_message(&slug) {
                sink.notify(&message, Severity::Error);
            }
        }

        Ok(false)
    }

    /// Returns true if the product may be bought now.
    ///
    /// With `notify`, a blocked product also pushes one warning to `sink`.
    /// Lookup errors are logged and the product is treated as purchasable.
    pub fn validate_product(
        &self,
        product_id: ProductId,
        notify: bool,
        sink: &dyn NotificationSink,
    ) -> bool {
        match self.try_validate_product(product_id, notify, sink) {
            Ok(permitted) => permitted,
            Err(e) => {
                error!(product_id, notify, error = %e, "Product validation failed, allowing sale");
                true
            }
        }
    }

    // === Categories (archive pages) ===

    /// Returns true if products of `category` may be bought now.
    pub fn validate_category(&self, category: &Category) -> bool {
        if self.sale_permitted_now() {
            return true;
        }
        !self.is_restricted_category(&category.slug)
    }

    // === Carts ===

    /// Drops every line whose product is restricted, notifying per line.
    ///
    /// Returns the removed line keys in cart order.
    pub fn remove_restricted_lines(
        &self,
        cart: &mut Cart,
        sink: &dyn NotificationSink,
    ) -> Vec<String> {
        if cart.is_empty() || self.sale_permitted_now() {
            return Vec::new();
        }

        let blocked: Vec<String> = cart
            .lines
            .iter()
            .filter(|line| !self.validate_product(line.product_id, true, sink))
            .map(|line| line.line_key.clone())
            .collect();

        for key in &blocked {
            cart.remove_line(key);
        }
        if !blocked.is_empty() {
            debug!(removed = blocked.len(), "Removed restricted cart lines");
        }
        blocked
    }

    // === Messages ===

    /// Renders the warning for `category_slug`, surfacing template errors.
    ///
    /// Returns `Ok(None)` when the rendered message is empty.
    pub fn try_build_warning_message(&self, category_slug: &str) -> Result<Option<String>> {
        let name = match self.catalog.category_by_slug(category_slug) {
            Ok(Some(category)) => category.name,
            Ok(None) => category_slug.to_string(),
            Err(e) => {
                warn!(category_slug, error = %e, "Category lookup failed, using slug as name");
                category_slug.to_string()
            }
        };

        let message = format_template(
            &self.config.warning_template,
            &[
                name.as_str(),
                self.config.restriction_start.as_str(),
                self.config.restriction_end.as_str(),
            ],
        )?;
        let message = self.filter.apply(&message)?;

        Ok(if message.trim().is_empty() {
            None
        } else {
            Some(message)
        })
    }

    /// Renders the warning for `category_slug`, or `None` on any failure.
    pub fn build_warning_message(&self, category_slug: &str) -> Option<String> {
        match self.try_build_warning_message(category_slug) {
            Ok(message) => message,
            Err(e) => {
                error!(category_slug, error = %e, "Failed to build warning message");
                None
            }
        }
    }

    /// Warning for a product detail page, if the product is blocked now.
    pub fn product_warning(&self, product_id: ProductId) -> Option<String> {
        if self.sale_permitted_now() {
            return None;
        }
        match self.restricted_category_for_product(product_id) {
            Ok(Some(slug)) => self.build_warning_message(&slug),
            Ok(None) => None,
            Err(e) => {
                error!(product_id, error = %e, "Product warning lookup failed");
                None
            }
        }
    }

    /// Warning for a category archive page, if the category is blocked now.
    pub fn category_warning(&self, category: &Category) -> Option<String> {
        if self.validate_category(category) {
            return None;
        }
        self.build_warning_message(&category.slug)
    }
}

impl fmt::Debug for RestrictionEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestrictionEvaluator")
            .field("config", &self.config)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::CartLine;
    use crate::catalog::InMemoryCatalog;
    use crate::notice::NoticeBuffer;
    use crate::template::Shortcodes;
    use crate::time_window::FixedClock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::{Layer, Registry};

    // ==================== Fixtures ====================

    const WINE_BOTTLE: ProductId = 1;
    const CHEESE: ProductId = 2;
    const GIFT_BOX: ProductId = 3;
    const VODKA: ProductId = 4;

    fn catalog() -> InMemoryCatalog {
        InMemoryCatalog::new()
            .with_category("wine", "Wine")
            .with_category("spirits", "Spirits")
            .with_category("cheese", "Cheese")
            .with_category("gifts", "Gifts")
            .with_product(WINE_BOTTLE, &["wine"])
            .with_product(CHEESE, &["cheese"])
            .with_product(GIFT_BOX, &["gifts", "spirits", "wine"])
            .with_product(VODKA, &["spirits"])
    }

    fn config(start: &str, end: &str, categories: &[&str]) -> RestrictionConfig {
        RestrictionConfig {
            enabled: true,
            restriction_start: start.to_string(),
            restriction_end: end.to_string(),
            restricted_categories: categories.iter().map(|s| s.to_string()).collect(),
            warning_template: "%1$s sale blocked %2$s-%3$s".to_string(),
            ..Default::default()
        }
    }

    fn evaluator_at(config: RestrictionConfig, now: &str) -> RestrictionEvaluator {
        RestrictionEvaluator::new(config, Arc::new(catalog()))
            .with_clock(Arc::new(FixedClock(now.parse().unwrap())))
    }

    fn overnight_at(now: &str) -> RestrictionEvaluator {
        evaluator_at(config("22:00", "09:00", &["wine"]), now)
    }

    struct FailingCatalog;

    impl Catalog for FailingCatalog {
        fn categories_for_product(&self, _: ProductId) -> std::result::Result<Vec<Category>, LookupError> {
            Err(LookupError::Unavailable("connection refused".into()))
        }

        fn category_by_slug(&self, _: &str) -> std::result::Result<Option<Category>, LookupError> {
            Err(LookupError::Unavailable("connection refused".into()))
        }

        fn all_categories(&self) -> std::result::Result<Vec<Category>, LookupError> {
            Err(LookupError::Unavailable("connection refused".into()))
        }
    }

    /// Counts every tracing event emitted while installed.
    struct CountingLayer(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> Layer<S> for CountingLayer {
        fn on_event(&self, _event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn count_events<T>(f: impl FnOnce() -> T) -> (T, usize) {
        let count = Arc::new(AtomicUsize::new(0));
        let subscriber = Registry::default().with(CountingLayer(count.clone()));
        let out = tracing::subscriber::with_default(subscriber, f);
        (out, count.load(Ordering::SeqCst))
    }

    // ==================== Window Tests ====================

    #[test]
    fn overnight_scenario() {
        let sink = NoticeBuffer::new();
        assert!(!overnight_at("23:00").validate_product(WINE_BOTTLE, false, &sink));
        assert!(overnight_at("10:00").validate_product(WINE_BOTTLE, false, &sink));
    }

    #[test]
    fn intraday_scenario() {
        let sink = NoticeBuffer::new();
        let at = |now| evaluator_at(config("09:00", "17:00", &["spirits"]), now);

        assert!(at("12:00").validate_product(VODKA, false, &sink));
        assert!(!at("20:00").validate_product(VODKA, false, &sink));
        assert!(!at("08:00").validate_product(VODKA, false, &sink));
    }

    #[test]
    fn disabled_always_permits() {
        let config = RestrictionConfig {
            enabled: false,
            ..config("22:00", "09:00", &["wine"])
        };
        let evaluator = evaluator_at(config, "23:00");
        let sink = NoticeBuffer::new();

        assert!(evaluator.sale_permitted_now());
        assert!(evaluator.validate_product(WINE_BOTTLE, true, &sink));
        assert!(evaluator.validate_category(&Category::new("wine", "Wine")));
        assert!(sink.is_empty());
    }

    #[test]
    fn invalid_config_disables_evaluator() {
        let evaluator = evaluator_at(config("10:00", "10:00", &["wine"]), "10:00");
        assert!(!evaluator.is_enabled());
        assert!(evaluator.window().is_none());
        assert!(evaluator.sale_permitted_at("03:00".parse().unwrap()));

        let evaluator = evaluator_at(config("22:00", "09:00", &[]), "23:00");
        assert!(!evaluator.is_enabled());
        assert!(evaluator.validate_product(WINE_BOTTLE, false, &NoticeBuffer::new()));
    }

    #[test]
    fn sale_permitted_at_matches_window() {
        let evaluator = overnight_at("12:00");
        assert!(!evaluator.sale_permitted_at("22:00".parse().unwrap()));
        assert!(evaluator.sale_permitted_at("09:00".parse().unwrap()));
        assert!(evaluator.sale_permitted_now());
    }

    // ==================== Category Resolution Tests ====================

    #[test]
    fn first_restricted_category_uses_given_order() {
        let evaluator = evaluator_at(config("22:00", "09:00", &["wine", "spirits"]), "23:00");

        assert_eq!(
            evaluator.first_restricted_category(["gifts", "spirits", "wine"]),
            Some("spirits")
        );
        assert_eq!(
            evaluator.first_restricted_category(["wine", "spirits"]),
            Some("wine")
        );
        assert_eq!(evaluator.first_restricted_category(["gifts", "Wine"]), None);
        assert_eq!(evaluator.first_restricted_category(Vec::<&str>::new()), None);
    }

    #[test]
    fn multi_category_product_reports_first_match() {
        let evaluator = evaluator_at(config("22:00", "09:00", &["wine", "spirits"]), "23:00");
        let sink = NoticeBuffer::new();

        assert!(!evaluator.validate_product(GIFT_BOX, true, &sink));
        let notices = sink.take();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].message, "Spirits sale blocked 22:00-09:00");
    }

    // ==================== Product Validation Tests ====================

    #[test]
    fn unrestricted_product_always_purchasable() {
        let sink = NoticeBuffer::new();
        for now in ["00:00", "03:00", "22:00", "23:59", "12:00"] {
            assert!(overnight_at(now).validate_product(CHEESE, true, &sink), "at {now}");
        }
        assert!(sink.is_empty());
    }

    #[test]
    fn unknown_product_is_purchasable() {
        assert!(overnight_at("23:00").validate_product(999, true, &NoticeBuffer::new()));
    }

    #[test]
    fn notify_pushes_exactly_one_notice() {
        let sink = NoticeBuffer::new();
        assert!(!overnight_at("23:00").validate_product(WINE_BOTTLE, true, &sink));

        let notices = sink.take();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].message, "Wine sale blocked 22:00-09:00");
        assert_eq!(notices[0].severity, Severity::Error);
    }

    #[test]
    fn without_notify_no_notice() {
        let sink = NoticeBuffer::new();
        assert!(!overnight_at("23:00").validate_product(WINE_BOTTLE, false, &sink));
        assert!(sink.is_empty());
    }

    #[test]
    fn empty_message_is_not_pushed() {
        let config = RestrictionConfig {
            warning_template: "  ".to_string(),
            ..config("22:00", "09:00", &["wine"])
        };
        let sink = NoticeBuffer::new();
        assert!(!evaluator_at(config, "23:00").validate_product(WINE_BOTTLE, true, &sink));
        assert!(sink.is_empty());
    }

    #[test]
    fn catalog_is_not_consulted_outside_restriction() {
        let evaluator = RestrictionEvaluator::new(
            config("22:00", "09:00", &["wine"]),
            Arc::new(FailingCatalog),
        )
        .with_clock(Arc::new(FixedClock("12:00".parse().unwrap())));

        let (permitted, events) =
            count_events(|| evaluator.validate_product(WINE_BOTTLE, true, &NoticeBuffer::new()));
        assert!(permitted);
        assert_eq!(events, 0);
    }

    #[test]
    fn lookup_failure_fails_open_with_one_log_entry() {
        let evaluator = RestrictionEvaluator::new(
            config("22:00", "09:00", &["wine"]),
            Arc::new(FailingCatalog),
        )
        .with_clock(Arc::new(FixedClock("23:00".parse().unwrap())));
        let sink = NoticeBuffer::new();

        let (permitted, events) =
            count_events(|| evaluator.validate_product(WINE_BOTTLE, true, &sink));
        assert!(permitted);
        assert_eq!(events, 1);
        assert!(sink.is_empty());
    }

    #[test]
    fn try_validate_product_exposes_error() {
        let evaluator = RestrictionEvaluator::new(
            config("22:00", "09:00", &["wine"]),
            Arc::new(FailingCatalog),
        )
        .with_clock(Arc::new(FixedClock("23:00".parse().unwrap())));

        let result = evaluator.try_validate_product(WINE_BOTTLE, false, &NoticeBuffer::new());
        assert!(matches!(result, Err(crate::error::CoreError::Lookup(_))));
    }

    // ==================== Category Validation Tests ====================

    #[test]
    fn validate_category_follows_window() {
        let wine = Category::new("wine", "Wine");
        let cheese = Category::new("cheese", "Cheese");

        assert!(!overnight_at("23:30").validate_category(&wine));
        assert!(overnight_at("23:30").validate_category(&cheese));
        assert!(overnight_at("15:00").validate_category(&wine));
    }

    // ==================== Message Tests ====================

    #[test]
    fn message_uses_category_name() {
        let message = overnight_at("23:00").build_warning_message("wine");
        assert_eq!(message.as_deref(), Some("Wine sale blocked 22:00-09:00"));
    }

    #[test]
    fn message_keeps_times_as_entered() {
        let evaluator = evaluator_at(config("9:00", "17:30", &["wine"]), "20:00");
        assert_eq!(
            evaluator.build_warning_message("wine").as_deref(),
            Some("Wine sale blocked 9:00-17:30")
        );
    }

    #[test]
    fn message_falls_back_to_slug() {
        let message = overnight_at("23:00").build_warning_message("mead");
        assert_eq!(message.as_deref(), Some("mead sale blocked 22:00-09:00"));

        let evaluator = RestrictionEvaluator::new(
            config("22:00", "09:00", &["wine"]),
            Arc::new(FailingCatalog),
        );
        assert_eq!(
            evaluator.build_warning_message("wine").as_deref(),
            Some("wine sale blocked 22:00-09:00")
        );
    }

    #[test]
    fn broken_template_yields_no_message() {
        let config = RestrictionConfig {
            warning_template: "%1$s %5$s".to_string(),
            ..config("22:00", "09:00", &["wine"])
        };
        let evaluator = evaluator_at(config, "23:00");
        assert!(evaluator.build_warning_message("wine").is_none());
        assert!(evaluator.try_build_warning_message("wine").is_err());

        // Enforcement still applies without a message.
        let sink = NoticeBuffer::new();
        assert!(!evaluator.validate_product(WINE_BOTTLE, true, &sink));
        assert!(sink.is_empty());
    }

    #[test]
    fn message_goes_through_content_filter() {
        let config = RestrictionConfig {
            warning_template: "%1$s unavailable. Call [store_phone].".to_string(),
            ..config("22:00", "09:00", &["wine"])
        };
        let evaluator = evaluator_at(config, "23:00")
            .with_content_filter(Arc::new(Shortcodes::new().with("store_phone", "555-0100")));
        assert_eq!(
            evaluator.build_warning_message("wine").as_deref(),
            Some("Wine unavailable. Call 555-0100.")
        );
    }

    #[test]
    fn product_and_category_warnings() {
        let evaluator = overnight_at("23:00");
        assert!(evaluator.product_warning(WINE_BOTTLE).is_some());
        assert!(evaluator.product_warning(CHEESE).is_none());
        assert!(evaluator
            .category_warning(&Category::new("wine", "Wine"))
            .is_some());

        let evaluator = overnight_at("11:00");
        assert!(evaluator.product_warning(WINE_BOTTLE).is_none());
        assert!(evaluator
            .category_warning(&Category::new("wine", "Wine"))
            .is_none());
    }

    // ==================== Cart Tests ====================

    #[test]
    fn remove_restricted_lines_strips_and_notifies() {
        let evaluator = overnight_at("01:00");
        let sink = NoticeBuffer::new();
        let mut cart = Cart::new(vec![
            CartLine::new("l1", WINE_BOTTLE),
            CartLine::new("l2", CHEESE),
            CartLine::new("l3", GIFT_BOX),
        ]);

        let removed = evaluator.remove_restricted_lines(&mut cart, &sink);
        assert_eq!(removed, vec!["l1".to_string(), "l3".to_string()]);
        assert_eq!(cart.lines, vec![CartLine::new("l2", CHEESE)]);
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn remove_restricted_lines_noop_outside_restriction() {
        let evaluator = overnight_at("13:00");
        let mut cart = Cart::new(vec![CartLine::new("l1", WINE_BOTTLE)]);
        assert!(evaluator
            .remove_restricted_lines(&mut cart, &NoticeBuffer::new())
            .is_empty());
        assert_eq!(cart.lines.len(), 1);
    }

    #[test]
    fn debug_output_omits_collaborators() {
        let evaluator = overnight_at("13:00");
        let debug = format!("{evaluator:?}");
        assert!(debug.contains("RestrictionEvaluator"));
        assert!(debug.contains(".."));
    }
}
