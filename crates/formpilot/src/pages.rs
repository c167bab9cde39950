//! Page definitions of the listing application.
//!
//! Controls that carry a `data-testid` are located by it; controls without
//! one fall back to the label texts the application renders.

use crate::locator::{ControlTag, Selector};
use crate::page_object::{FieldDescriptor, FieldKind, FormPage, LocatorRegistry, PageObject};

/// Logical field names
pub mod fields {
    /// Login identifier (email)
    pub const IDENTIFIER: &str = "identifier";
    /// Login secret
    pub const SECRET: &str = "secret";

    /// Vehicle brand (cascade parent)
    pub const BRAND: &str = "brand";
    /// Vehicle model (cascade child of brand)
    pub const MODEL: &str = "model";
    /// Year of manufacture
    pub const YEAR: &str = "year";
    /// Mileage in km
    pub const MILEAGE: &str = "mileage";
    /// Body type
    pub const BODY_TYPE: &str = "body_type";
    /// Price in million VND
    pub const PRICE: &str = "price";
    /// Listing title
    pub const TITLE: &str = "title";
    /// Listing description
    pub const DESCRIPTION: &str = "description";
    /// Province of sale (cascade parent)
    pub const PROVINCE: &str = "province";
    /// District of sale (cascade child of province)
    pub const DISTRICT: &str = "district";
    /// Domestic or imported vehicle
    pub const ORIGIN: &str = "origin";
    /// Listing photos
    pub const ATTACHMENT: &str = "attachment";
}

/// Path of the listing creation form
pub const LISTING_FORM_PATH: &str = "/create-listing";

/// `localStorage` key holding the session token
pub const DEFAULT_TOKEN_KEY: &str = "auth_token";

/// The login modal opened from the entry page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthModal {
    trigger: Selector,
    form: FormPage,
    token_key: String,
}

impl AuthModal {
    /// Create a login modal description
    #[must_use]
    pub fn new(trigger: Selector, form: FormPage, token_key: impl Into<String>) -> Self {
        Self {
            trigger,
            form,
            token_key: token_key.into(),
        }
    }

    /// Use a different session token key
    #[must_use]
    pub fn with_token_key(mut self, key: impl Into<String>) -> Self {
        self.token_key = key.into();
        self
    }

    /// Button that opens the modal
    #[must_use]
    pub const fn trigger(&self) -> &Selector {
        &self.trigger
    }

    /// `localStorage` key of the session token
    #[must_use]
    pub fn token_key(&self) -> &str {
        &self.token_key
    }
}

impl PageObject for AuthModal {
    fn path(&self) -> &str {
        self.form.path()
    }

    fn registry(&self) -> &LocatorRegistry {
        self.form.registry()
    }

    fn submit_control(&self) -> &Selector {
        self.form.submit_control()
    }

    fn ready_marker(&self) -> &Selector {
        &self.trigger
    }

    fn page_name(&self) -> &str {
        self.form.page_name()
    }
}

/// Login modal of the entry page
#[must_use]
pub fn auth_modal() -> AuthModal {
    let registry = LocatorRegistry::new()
        .with_field(
            FieldDescriptor::new(fields::IDENTIFIER, FieldKind::Text, Selector::test_id("login-email"))
                .or(Selector::placeholder("Email"))
                .required(),
        )
        .with_field(
            FieldDescriptor::new(fields::SECRET, FieldKind::Text, Selector::test_id("login-password"))
                .or(Selector::placeholder("Mật khẩu"))
                .required(),
        );
    let form = FormPage::new("auth_modal", "/", Selector::submit_button("Đăng nhập"), registry);
    AuthModal::new(
        Selector::button("Đăng Nhập / Đăng ký"),
        form,
        DEFAULT_TOKEN_KEY,
    )
}

fn labelled(name: &str, kind: FieldKind, label: &str) -> FieldDescriptor {
    let control = match kind {
        FieldKind::Select => ControlTag::Select,
        FieldKind::Textarea => ControlTag::Textarea,
        FieldKind::Text | FieldKind::Radio | FieldKind::File => ControlTag::Input,
    };
    FieldDescriptor::new(name, kind, Selector::test_id(name)).or(Selector::after_label(label, control))
}

/// Vehicle listing creation form
#[must_use]
pub fn listing_form() -> FormPage {
    let registry = LocatorRegistry::new()
        .with_field(labelled(fields::BRAND, FieldKind::Select, "Hãng xe").required())
        .with_field(
            labelled(fields::MODEL, FieldKind::Select, "Dòng xe")
                .depends_on(fields::BRAND)
                .required(),
        )
        .with_field(
            labelled(fields::YEAR, FieldKind::Text, "Năm sản xuất")
                .digits_only()
                .required(),
        )
        .with_field(
            labelled(fields::MILEAGE, FieldKind::Text, "Số km đã đi")
                .digits_only()
                .required(),
        )
        .with_field(labelled(fields::BODY_TYPE, FieldKind::Select, "Kiểu dáng"))
        .with_field(
            labelled(fields::PRICE, FieldKind::Text, "Giá bán")
                .digits_only()
                .required(),
        )
        .with_field(labelled(fields::TITLE, FieldKind::Text, "Tiêu đề").required())
        .with_field(labelled(fields::DESCRIPTION, FieldKind::Textarea, "Mô tả").required())
        .with_field(labelled(fields::PROVINCE, FieldKind::Select, "Nơi bán xe").required())
        .with_field(
            labelled(fields::DISTRICT, FieldKind::Select, "Quận/Huyện")
                .depends_on(fields::PROVINCE)
                .required(),
        )
        .with_field(labelled(fields::ORIGIN, FieldKind::Radio, "Xuất xứ"))
        .with_field(
            FieldDescriptor::new(fields::ATTACHMENT, FieldKind::File, Selector::id("images"))
                .required(),
        );
    FormPage::new(
        "listing_form",
        LISTING_FORM_PATH,
        Selector::submit_button("Đăng tin"),
        registry,
    )
}
