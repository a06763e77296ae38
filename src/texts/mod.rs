use serde::{Deserialize, Serialize};

/// Customer-facing language. Unknown/unset preferences fall back to English.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    #[default]
    En,
    Am,
}

/// Typed key into the localized text table. The engine never formats raw
/// string literals; every customer-visible line goes through [`text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Text {
    ChooseLang,
    Welcome,
    Closed,
    AskPhone,
    PhoneSaved,
    ChooseCafe,
    MenuHeader,
    AddedToCart,
    CartEmpty,
    OrderCancelled,
    DeliveryFee,
    Total,
    AskLocation,
    LocationError,
    OrderSent,
    OrderAccepted,
    OrderDeclined,
    PayPrompt,
    PayInstructions,
    PayCheckStatus,
    PayNotConfirmed,
    PayCancelled,
    PaymentFailed,
    SystemError,
    AdminBroadcast,
    ProfileHeader,
    LocationSet,
    LocationNotSet,
    BtnPhone,
    BtnLocation,
    BtnDone,
    BtnCancel,
    BtnBack,
    BtnProfile,
    BtnSwitchLang,
    BtnEditPhone,
    BtnCheckPayment,
    BtnCancelPayment,
}

/// Look up a localized string. Placeholders are `{}` and are filled by the
/// caller via [`fill`].
pub fn text(lang: Lang, key: Text) -> &'static str {
    match lang {
        Lang::En => english(key),
        Lang::Am => amharic(key),
    }
}

/// Replace `{}` placeholders left to right. Missing arguments leave the
/// placeholder in place, mirroring the tolerant lookup of the text table.
pub fn fill(template: &str, args: &[&str]) -> String {
    let mut out = template.to_string();
    for arg in args {
        if let Some(idx) = out.find("{}") {
            out.replace_range(idx..idx + 2, arg);
        }
    }
    out
}

fn english(key: Text) -> &'static str {
    match key {
        Text::ChooseLang => "Please select language:",
        Text::Welcome => "Welcome! 👋",
        Text::Closed => "⏰ We are closed right now. Orders are accepted 6:00–22:00.",
        Text::AskPhone => "Please share your phone number to continue.",
        Text::PhoneSaved => "📞 Phone number saved.",
        Text::ChooseCafe => "Choose a cafe:",
        Text::MenuHeader => "📋 Menu — {}",
        Text::AddedToCart => "✅ {} added (x{})",
        Text::CartEmpty => "🛒 Your cart is empty. Pick something first.",
        Text::OrderCancelled => "❌ Order cancelled.",
        Text::DeliveryFee => "Delivery fee",
        Text::Total => "Total",
        Text::AskLocation => "📍 Please share your delivery location.",
        Text::LocationError => "😔 Sorry, that location is outside our delivery area.",
        Text::OrderSent => "📦 Order {} sent! We will notify you once the merchant responds.",
        Text::OrderAccepted => "✅ Your order {} was accepted! It is on the way.",
        Text::OrderDeclined => "❌ Sorry, your order {} was declined.",
        Text::PayPrompt => "💳 Please complete the payment: {}",
        Text::PayInstructions => "💳 {}",
        Text::PayCheckStatus => "⌛ Payment not confirmed yet. Tap «Check payment» once you have paid.",
        Text::PayNotConfirmed => "⌛ We could not confirm the payment yet. Try again in a moment.",
        Text::PayCancelled => "🚫 Payment cancelled. Your cart was reset.",
        Text::PaymentFailed => "⚠️ Could not start the payment. Please try again.",
        Text::SystemError => "⚠️ System error. Please contact support or try again.",
        Text::AdminBroadcast => "📢 Announcement:\n{}",
        Text::ProfileHeader => "👤 Profile\n\n📞 Phone: {}\n🗣 Language: English\n📍 Location: {}",
        Text::LocationSet => "Set ✅",
        Text::LocationNotSet => "Not set ❌",
        Text::BtnPhone => "📞 Share phone number",
        Text::BtnLocation => "📍 Share location",
        Text::BtnDone => "✅ Done",
        Text::BtnCancel => "❌ Cancel",
        Text::BtnBack => "⬅️ Back",
        Text::BtnProfile => "👤 My Profile",
        Text::BtnSwitchLang => "🔄 Switch Language",
        Text::BtnEditPhone => "✏️ Change Phone",
        Text::BtnCheckPayment => "🔄 Check payment",
        Text::BtnCancelPayment => "🚫 Cancel payment",
    }
}

fn amharic(key: Text) -> &'static str {
    match key {
        Text::ChooseLang => "እባክዎ ቋንቋ ይምረጡ:",
        Text::Welcome => "እንኳን ደህና መጡ! 👋",
        Text::Closed => "⏰ አሁን ዝግ ነን። ትዕዛዝ የሚቀበለው ከ6:00 እስከ 22:00 ነው።",
        Text::AskPhone => "ለመቀጠል ስልክ ቁጥርዎን ያጋሩ።",
        Text::PhoneSaved => "📞 ስልክ ቁጥር ተመዝግቧል።",
        Text::ChooseCafe => "ካፌ ይምረጡ:",
        Text::MenuHeader => "📋 ምናሌ — {}",
        Text::AddedToCart => "✅ {} ታክሏል (x{})",
        Text::CartEmpty => "🛒 ጋሪዎ ባዶ ነው። መጀመሪያ ይምረጡ።",
        Text::OrderCancelled => "❌ ትዕዛዝ ተሰርዟል።",
        Text::DeliveryFee => "የመላኪያ ክፍያ",
        Text::Total => "ጠቅላላ",
        Text::AskLocation => "📍 እባክዎ የመላኪያ አድራሻዎን ያጋሩ።",
        Text::LocationError => "😔 ይቅርታ፣ ያ ቦታ ከአገልግሎት ክልላችን ውጪ ነው።",
        Text::OrderSent => "📦 ትዕዛዝ {} ተልኳል! ነጋዴው ሲመልስ እናሳውቅዎታለን።",
        Text::OrderAccepted => "✅ ትዕዛዝዎ {} ተቀብሏል! በመንገድ ላይ ነው።",
        Text::OrderDeclined => "❌ ይቅርታ፣ ትዕዛዝዎ {} ውድቅ ተደርጓል።",
        Text::PayPrompt => "💳 እባክዎ ክፍያውን ያጠናቅቁ: {}",
        Text::PayInstructions => "💳 {}",
        Text::PayCheckStatus => "⌛ ክፍያው ገና አልተረጋገጠም። ከከፈሉ በኋላ «ክፍያ ያረጋግጡ» ይጫኑ።",
        Text::PayNotConfirmed => "⌛ ክፍያውን ገና ማረጋገጥ አልቻልንም። ከጥቂት ቆይታ በኋላ ይሞክሩ።",
        Text::PayCancelled => "🚫 ክፍያ ተሰርዟል። ጋሪዎ ተጸድቷል።",
        Text::PaymentFailed => "⚠️ ክፍያውን መጀመር አልተቻለም። እባክዎ እንደገና ይሞክሩ።",
        Text::SystemError => "⚠️ የስርዓት ስህተት። እባክዎ ድጋፍን ያነጋግሩ ወይም እንደገና ይሞክሩ።",
        Text::AdminBroadcast => "📢 ማስታወቂያ:\n{}",
        Text::ProfileHeader => "👤 የግል መረጃ\n\n📞 ስልክ: {}\n🗣 ቋንቋ: አማርኛ\n📍 አድራሻ: {}",
        Text::LocationSet => "ተመዝግቧል ✅",
        Text::LocationNotSet => "አልተመዘገበም ❌",
        Text::BtnPhone => "📞 ስልክ ቁጥር ያጋሩ",
        Text::BtnLocation => "📍 አድራሻ ያጋሩ",
        Text::BtnDone => "✅ ጨርሻለሁ",
        Text::BtnCancel => "❌ ሰርዝ",
        Text::BtnBack => "⬅️ ተመለስ",
        Text::BtnProfile => "👤 የእኔ መረጃ",
        Text::BtnSwitchLang => "🔄 ቋንቋ ቀይር",
        Text::BtnEditPhone => "✏️ ስልክ ለመቀየር",
        Text::BtnCheckPayment => "🔄 ክፍያ ያረጋግጡ",
        Text::BtnCancelPayment => "🚫 ክፍያ ሰርዝ",
    }
}

/// The two language-selection labels shown before a language is known.
pub const LANG_CHOICE_EN: &str = "🇺🇸 English";
pub const LANG_CHOICE_AM: &str = "🇪🇹 አማርኛ";

/// Parse a language-selection reply. Tolerant of surrounding emoji and
/// whitespace; anything unrecognized returns `None`.
pub fn parse_lang_choice(input: &str) -> Option<Lang> {
    if input.contains("English") {
        Some(Lang::En)
    } else if input.contains("አማርኛ") {
        Some(Lang::Am)
    } else {
        None
    }
}
