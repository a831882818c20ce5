pub const PERSONA: &str = include_str!("../data/prompts/persona.txt");
pub const TITLE_SYSTEM: &str = include_str!("../data/prompts/title_system.txt");
pub const TITLE_USER: &str = include_str!("../data/prompts/title_user.txt");

/// Stands in for an empty user message so the prompt still asks for something.
pub const EMPTY_MESSAGE_PLACEHOLDER: &str = "Tolong jelaskan isi file ini.";

pub const FILE_SECTION: &str = "[ISI FILE {{label}}]:\n{{content}}";
pub const FILE_FAILED_NOTE: &str =
    "[CATATAN FILE]: Maaf, file yang dikirim tidak bisa dibaca ({{reason}}). Beritahu pengguna dengan sopan.";
pub const USER_NAME_LINE: &str = "Nama pengguna: {{name}}";

// User-facing fallbacks
pub const BUSY_REPLY: &str =
    "Maaf, semua jalur AI sedang sibuk. Coba kirim lagi dalam satu menit ya.";
pub const EMPTY_REPLY: &str = "Maaf, saya tidak bisa memberikan jawaban saat ini.";
pub const GENERIC_FAILURE: &str = "Gagal memproses.";
pub const INVALID_REQUEST: &str = "Permintaan tidak valid.";

/// Replace `{{key}}` placeholders in a template string.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{{{}}}}}", key), value);
    }
    result
}
