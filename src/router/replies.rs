//! Fixed user-facing texts
//!
//! Markdown texts use Telegram's legacy Markdown flavour.

use super::command::MenuButton;
use crate::mode::{ModeSetting, TutorMode};
use crate::prompts::GrammarLanguage;
use crate::registry::UserId;
use crate::session::SessionStats;
use crate::transport::OutgoingMessage;
use std::fmt::Write as _;

pub const PHOTO_HEADER: &str = "📷 **បកប្រែពីរូបភាព (Screenshot Translation):**\n\n";
pub const VOICE_HEADER: &str = "🎙";

pub const PHOTO_DOWNLOAD_FAILED: &str = "⚠️ មិនអាចទាញយករូបភាពបានទេ។ សូមសាកល្បងម្ដងទៀត។";
pub const PHOTO_READING: &str = "🖼 កំពុងអានអក្សរពីរូបភាព...";
pub const OCR_FAILED: &str = "⚠️ OCR Error: មិនអាចអានអក្សរពីរូបភាពបានទេ។";
pub const OCR_EMPTY: &str = "⚠️ មិនរកឃើញអក្សរ​ក្នុងរូបភាពទេ។ សូមប្រើរូបដែលអក្សរច្បាស់ជាងនេះ។";

pub const VOICE_DOWNLOAD_FAILED: &str = "⚠️ មិនអាចទាញយកសារសំឡេងបានទេ។ សូមសាកល្បងម្ដងទៀត។";
pub const VOICE_LISTENING: &str = "🎙 កំពុងស្តាប់សារសំឡេង...";
pub const TRANSCRIPTION_FAILED: &str = "⚠️ Voice Error: មិនអាចបំលែងសំឡេងទៅជាអក្សរបានទេ។";
pub const TRANSCRIPTION_EMPTY: &str = "⚠️ មិនឮពាក្យណាមួយក្នុងសារសំឡេងទេ។ សូមនិយាយឲ្យច្បាស់ជាងនេះ។";

pub const FEEDBACK_SENT: &str = "✅ Feedback sent.";
pub const FEEDBACK_NO_ADMIN: &str = "⚠️ ADMIN_ID មិនត្រូវបានកំណត់ទេ។";
pub const FEEDBACK_FAILED: &str = "⚠️ មិនអាចផ្ញើ Feedback ទៅ Admin បានទេ។";
pub const PERMISSION_DENIED: &str = "⛔ Command នេះសម្រាប់តែ Admin ប៉ុណ្ណោះ។";
pub const UNKNOWN_MODE: &str =
    "⚠️ Mode មិនស្គាល់។ ប្រើ: learner / foreigner / korean / japanese / filipino / auto";

pub fn welcome(first_name: Option<&str>) -> OutgoingMessage {
    let greeting = match first_name {
        Some(name) => format!("👋 **សួស្តី {name}! សូមស្វាគមន៍មកកាន់ AI Language Tutor!**\n\n"),
        None => "👋 **សួស្តី! សូមស្វាគមន៍មកកាន់ AI Language Tutor!**\n\n".to_string(),
    };
    let text = greeting
        + "👨‍🏫 **ខ្ញុំអាចជួយអ្នករៀនភាសា អង់គ្លេស និង ចិន។**\n\n\
           📚 **មុខងារសំខាន់ៗ:**\n\
           • Khmer → English + Chinese\n\
           • English/Chinese → Khmer\n\
           • Khmer → Korean / Japanese / Filipino\n\
           • 🖼 Screenshot OCR Translate\n\
           • 🎙 Voice message Translate\n\
           • ✏️ Grammar Correction: `/kmgrammar`, `/enggrammar`, `/cngrammar`\n\
           • 🔍 Explain sentence: `/explain ...`\n\
           • 👤 Profile: `/profile`\n\
           • ♻️ Reset: `/reset`\n\n\
           📌 Mode ដំបូងកំណត់ស្វ័យប្រវត្តិតាមភាសាសារ។\n\
           👇 **សូមចុចប៊ូតុងខាងក្រោម ដើម្បីចាប់ផ្តើម!**";
    OutgoingMessage::markdown(text).with_keyboard(MenuButton::keyboard())
}

pub fn help() -> OutgoingMessage {
    OutgoingMessage::markdown(
        "📖 **AI Language Tutor Bot – Help Guide**\n\n\
         🌐 Translation Commands\n\
         • `/mode learner`   – Khmer → English + Chinese\n\
         • `/mode foreigner` – English/Chinese → Khmer\n\
         • `/mode korean`    – Khmer → Korean (mode)\n\
         • `/mode japanese`  – Khmer → Japanese (mode)\n\
         • `/mode filipino`  – Khmer → Filipino (mode)\n\
         • `/ko` text        – Quick Khmer → Korean\n\
         • `/ja` text        – Quick Khmer → Japanese\n\
         • `/ph` text        – Quick Khmer → Filipino\n\n\
         ✏️ Grammar Correction\n\
         • Khmer: `/kmgrammar ប្រយោគភាសាខ្មែរ...`\n\
         • English: `/enggrammar your English sentence...`\n\
         • Chinese: `/cngrammar 你的中文句子...`\n\n\
         🔍 Sentence Explanation\n\
         • `/explain sentence` – ពន្យល់អត្ថន័យ + vocab + examples ជាភាសាខ្មែរ\n\n\
         👤 User Tools\n\
         • `/profile` – ព័ត៌មានអំពី account របស់អ្នកក្នុង bot\n\
         • `/reset` – កំណត់ Mode និង counter សារឡើងវិញ\n\
         • `/menu` – បង្ហាញប៊ូតុងមេឡើងវិញ\n\n\
         🖼 Screenshot OCR\n\
         • ផ្ញើ screenshot/រូបមានអក្សរ → Bot អាន OCR + បកប្រែ\n\n\
         🎙 Voice\n\
         • ផ្ញើសារសំឡេង → Bot បំលែងជាអក្សរ + បកប្រែ\n\n\
         📩 Feedback\n\
         • `/feedback សារ​របស់​អ្នក`\n\n\
         🛠 Admin only\n\
         • `/broadcast text` – Send announcement to all users\n\
         • `/stats` – View bot statistics\n",
    )
}

pub fn about() -> OutgoingMessage {
    OutgoingMessage::markdown(
        "ℹ️ **About AI Language Tutor Bot**\n\n\
         • Khmer ⇄ English ⇄ Chinese tutor\n\
         • Extra modes: Korean, Japanese, Filipino\n\
         • Screenshot OCR via Groq Vision\n\
         • Voice messages via Groq Whisper\n\
         • Grammar correction (Khmer, English, Chinese)\n\
         • Sentence explanation tool (`/explain`)\n\
         • Auto-detect mode\n",
    )
}

pub fn menu() -> OutgoingMessage {
    OutgoingMessage::markdown("📋 **Main Menu**\nសូមជ្រើសរើស Mode ឬ Tools ពីប៊ូតុងខាងក្រោម 👇")
        .with_keyboard(MenuButton::keyboard())
}

pub fn mode_overview(current: ModeSetting) -> OutgoingMessage {
    let mut text = format!("🔧 **Current Mode:** `{current}`\n\n");
    for mode in TutorMode::ALL {
        let _ = writeln!(text, "• `/mode {}` – {}", mode.as_str(), mode.label());
    }
    text.push_str("• `/mode auto` – Auto-detect\n");
    OutgoingMessage::markdown(text)
}

pub fn mode_changed(setting: ModeSetting) -> OutgoingMessage {
    OutgoingMessage::markdown(format!("✅ Mode ផ្លាស់ប្ដូរ​ទៅ **{}**", setting.label()))
}

/// Confirmation for a keyboard mode button
pub fn mode_button(mode: TutorMode) -> OutgoingMessage {
    let hint = match mode {
        TutorMode::KhmerLearner => {
            "✅ Mode: Khmer Learner\nសរសេរ ខ្មែរ/EN → ខ្ញុំនឹងបកប្រែ EN + CN (មាន Pinyin)."
        }
        TutorMode::Foreigner => "✅ Mode: Foreigner\nវាយ English ឬ Chinese → ខ្ញុំបកប្រែជាខ្មែរ។",
        TutorMode::KoreanLearner => {
            "✅ Mode: Korean Learner\n\
             វាយប្រយោគខ្មែរ → ខ្ញុំនឹងបកប្រែជាកូរ៉េ (Hangul + Romanization + Khmer meaning)."
        }
        TutorMode::JapaneseLearner => {
            "✅ Mode: Japanese Learner\n\
             វាយប្រយោគខ្មែរ → ខ្ញុំនឹងបកប្រែជាជប៉ុន (Japanese + Romaji + Khmer meaning)."
        }
        TutorMode::FilipinoLearner => {
            "✅ Mode: Filipino Learner\n\
             វាយប្រយោគខ្មែរ → ខ្ញុំនឹងបកប្រែជាភាសាហ្វីលីពីន (Filipino + Khmer meaning)."
        }
    };
    OutgoingMessage::markdown(hint)
}

pub fn grammar_tools() -> OutgoingMessage {
    OutgoingMessage::markdown(
        "✏️ **Grammar Tools**\n\n\
         • Khmer: `/kmgrammar ប្រយោគភាសាខ្មែរ...`\n\
         • English: `/enggrammar your English sentence...`\n\
         • Chinese: `/cngrammar 你的中文句子...`",
    )
}

pub fn ocr_guide() -> OutgoingMessage {
    OutgoingMessage::markdown(
        "🖼 **Screenshot OCR Guide**\n\n\
         1️⃣ ថត screenshot ឬរូបមានអក្សរ\n\
         2️⃣ ផ្ញើរូបនោះមក bot (photo)\n\
         3️⃣ Bot នឹងអានអក្សរ និងបកប្រែស្វ័យប្រវត្តិ",
    )
}

pub fn profile(user: UserId, registered: bool, mode: ModeSetting, messages: u64) -> OutgoingMessage {
    let registered = if registered { "Yes" } else { "No" };
    OutgoingMessage::markdown(format!(
        "👤 **User Profile (in this bot)**\n\n\
         • ID: `{user}`\n\
         • Registered: `{registered}`\n\
         • Current mode: `{mode}`\n\
         • Messages this run: `{messages}`\n\n\
         📌 អ្នកអាចប្តូរ Mode ដោយប្រើ `/mode ...`\n\
         📌 ប្រើ `/reset` ប្រសិនបើចង់ចាប់ផ្តើមថ្មី។"
    ))
}

pub fn reset_done() -> OutgoingMessage {
    OutgoingMessage::markdown(
        "♻️ **Reset complete!**\n\
         • Mode ត្រូវបានកំណត់វិញទៅ `auto`\n\
         • Message counter ត្រូវបានកំណត់ជា `0`\n\n\
         អាចចាប់ផ្តើមជាមួយប្រយោគថ្មីបានហើយ 😄",
    )
}

pub fn stats(registered: usize, sessions: &SessionStats) -> OutgoingMessage {
    let mut text = format!(
        "📊 **Bot Stats**\n\n\
         • Registered users: `{registered}`\n\
         • Active users in memory: `{}`\n\
         • Total messages this run: `{}`\n\n\
         Modes:\n",
        sessions.active_users, sessions.total_messages
    );
    for (setting, count) in &sessions.modes {
        let _ = writeln!(text, "• {setting}: `{count}`");
    }
    OutgoingMessage::markdown(text)
}

pub fn broadcast_report(sent: usize, failed: usize) -> OutgoingMessage {
    OutgoingMessage::plain(format!("✅ Broadcast sent to {sent} users. Failed: {failed}."))
}

pub fn broadcast_text(message: &str) -> String {
    format!("📢 {message}")
}

pub fn feedback_relay(from: UserId, message: &str) -> OutgoingMessage {
    OutgoingMessage::plain(format!("📩 Feedback from {from}: {message}"))
}

pub fn unknown_command(command: &str) -> OutgoingMessage {
    OutgoingMessage::markdown(format!(
        "⚠️ Command `{command}` មិនស្គាល់ទេ។\nប្រើ `/help` ដើម្បីមើល commands ទាំងអស់។"
    ))
}

/// Usage hint for a command invoked without its argument
pub fn usage(command: &str) -> OutgoingMessage {
    let text = match command {
        "feedback" => "សូមប្រើ៖ `/feedback សារ​របស់​អ្នក`",
        "broadcast" => "ប្រើ៖ `/broadcast សារ​ត្រូវ​ផ្ញើ`",
        "kmgrammar" => "ប្រើ៖ `/kmgrammar ប្រយោគភាសាខ្មែរ​របស់​អ្នក`",
        "enggrammar" => "Use: `/enggrammar your English sentence`",
        "cngrammar" => "使用: `/cngrammar 你的中文句子`",
        "explain" => {
            "ប្រើ៖ `/explain ប្រយោគ​របស់​អ្នក` (Kh/EN/CN)\n\
             ឧ. `/explain I will go to school tomorrow.`"
        }
        "ko" => "ប្រើ៖ `/ko ប្រយោគភាសាខ្មែររបស់អ្នក`",
        "ja" => "ប្រើ៖ `/ja ប្រយោគភាសាខ្មែររបស់អ្នក`",
        "ph" => "ប្រើ៖ `/ph ប្រយោគភាសាខ្មែររបស់អ្នក`",
        other => return OutgoingMessage::markdown(format!("ប្រើ៖ `/{other} ...`")),
    };
    OutgoingMessage::markdown(text)
}

pub fn grammar_progress(language: GrammarLanguage) -> &'static str {
    match language {
        GrammarLanguage::Khmer => "✏️ កំពុងពិនិត្យវេយ្យាករណ៍ភាសាខ្មែរ...",
        GrammarLanguage::English => "✏️ Checking English grammar...",
        GrammarLanguage::Chinese => "✏️ 正在检查中文语法 / កំពុងពិនិត្យភាសាចិន...",
    }
}

pub const EXPLAIN_PROGRESS: &str = "🔍 កំពុងពន្យល់ប្រយោគរបស់អ្នក...";

pub fn quick_translate_progress(mode: TutorMode) -> &'static str {
    match mode {
        TutorMode::KoreanLearner => "🇰🇷 កំពុងបកប្រែទៅភាសាកូរ៉េ...",
        TutorMode::JapaneseLearner => "🇯🇵 កំពុងបកប្រែទៅភាសាជប៉ុន...",
        TutorMode::FilipinoLearner => "🇵🇭 កំពុងបកប្រែទៅភាសាហ្វីលីពីន...",
        TutorMode::KhmerLearner | TutorMode::Foreigner => "⏳ កំពុងបកប្រែ...",
    }
}

/// Transcript echo placed above a voice reply
pub fn voice_header(transcript: &str) -> String {
    format!("{VOICE_HEADER} \"{transcript}\"\n\n")
}
