//! User-facing strings and menu labels.

use crate::db::models::QuizResult;
use crate::services::answers::ANSWER_FORMAT_EXAMPLE;
use crate::services::grading::{format_percent, ScoreRecord};

pub(crate) const MENU_PROFILE: &str = "👤 Profilim";
pub(crate) const MENU_GET_TEST: &str = "🧮 Test olish";
pub(crate) const MENU_MY_RESULTS: &str = "📈 Natijalarim";
pub(crate) const MENU_UPLOAD_TEST: &str = "📤 Test yuklash";
pub(crate) const MENU_SEND_TEST: &str = "📨 Test yuborish";
pub(crate) const MENU_EXPORT: &str = "📊 Natijalar (CSV)";
pub(crate) const MENU_CLEAN: &str = "🧹 Clean baza";

pub(crate) const STUDENT_MENU: &[&str] = &[MENU_PROFILE, MENU_GET_TEST, MENU_MY_RESULTS];
pub(crate) const TEACHER_MENU: &[&str] =
    &[MENU_UPLOAD_TEST, MENU_SEND_TEST, MENU_EXPORT, MENU_CLEAN];

pub(crate) const BUTTON_ANSWER: &str = "✍️ Javob yuborish";
pub(crate) const BUTTON_CONFIRM_CLEAN: &str = "✅ Ha, tozalash";
pub(crate) const BUTTON_CANCEL_CLEAN: &str = "❌ Yo‘q";

pub(crate) const WELCOME: &str = "👋 Xush kelibsiz!";
pub(crate) const ASK_NAME: &str = "Ismingizni kiriting:";
pub(crate) const REGISTERED: &str = "✅ Ro‘yxatdan o‘tish muvaffaqiyatli!";
pub(crate) const REGISTER_FIRST: &str = "Avval /start orqali ro‘yxatdan o‘ting.";
pub(crate) const USE_MENU: &str = "Quyidagi menyudan foydalaning 👇";

pub(crate) const ASK_TITLE: &str = "📝 Test nomini kiriting:";
pub(crate) const ASK_FILE: &str = "📎 Test faylini yuboring (rasm yoki hujjat):";
pub(crate) const FILE_REQUIRED: &str =
    "📎 Iltimos, test faylini rasm yoki hujjat sifatida yuboring.";

pub(crate) const NO_TESTS: &str = "📄 Hozircha testlar mavjud emas.";
pub(crate) const TEST_NOT_FOUND: &str = "❌ Test topilmadi.";
pub(crate) const PICK_TEST_TO_SEND: &str = "📨 Qaysi testni o‘quvchilarga yuboramiz?";
pub(crate) const NO_STUDENTS: &str = "👥 Hozircha ro‘yxatdan o‘tgan o‘quvchilar yo‘q.";

pub(crate) const NO_RESULTS: &str = "📊 Sizda hali natijalar yo‘q.";
pub(crate) const NO_RESULTS_TO_EXPORT: &str = "📊 Hozircha natijalar yo‘q.";
pub(crate) const EXPORT_CAPTION: &str = "📊 Natijalar CSV faylida";
pub(crate) const EXPORT_FILENAME: &str = "results.csv";

pub(crate) const CONFIRM_CLEAN: &str =
    "⚠️ Siz haqiqatdan ham tests va results jadvallarini tozalamoqchimisiz?";
pub(crate) const CLEAN_CANCELLED: &str = "❌ Tozalash bekor qilindi.";
pub(crate) const CLEAN_STALE: &str =
    "⌛ Bu so‘rov eskirgan. Tozalash uchun menyudan qayta tanlang.";

pub(crate) const NOT_A_TEACHER: &str = "❌ Siz o‘qituvchi emassiz.";
pub(crate) const GENERIC_FAILURE: &str =
    "⚠️ Xatolik yuz berdi. Iltimos, birozdan so‘ng qayta urinib ko‘ring.";

pub(crate) fn ask_answer_key() -> String {
    format!("🔑 To‘g‘ri javoblarni kiriting (masalan: {ANSWER_FORMAT_EXAMPLE}):")
}

pub(crate) fn ask_answers() -> String {
    format!("✍️ Javoblaringizni kiriting (masalan: {ANSWER_FORMAT_EXAMPLE}):")
}

pub(crate) fn invalid_format() -> String {
    format!("❌ Noto‘g‘ri format! Masalan: {ANSWER_FORMAT_EXAMPLE}")
}

pub(crate) fn profile(name: &str) -> String {
    format!("👤 {name}")
}

pub(crate) fn test_caption(title: &str) -> String {
    format!("🧮 {title}\n\nQuyidagi tugma orqali javob yuboring 👇")
}

pub(crate) fn test_saved(test_id: i64, questions: usize) -> String {
    format!("✅ Test saqlandi! (ID: {test_id}, {questions} ta savol)")
}

pub(crate) fn test_button(test_id: i64, title: &str) -> String {
    format!("#{test_id} {title}")
}

pub(crate) fn broadcast_summary(delivered: usize, failed: usize) -> String {
    if failed == 0 {
        format!("📨 Test {delivered} ta o‘quvchiga yuborildi.")
    } else {
        format!("📨 Test {delivered} ta o‘quvchiga yuborildi, {failed} tasiga yuborib bo‘lmadi.")
    }
}

pub(crate) fn cleaned(tests: u64, results: u64) -> String {
    format!("✅ Baza tozalandi! (tests: {tests}, results: {results})")
}

pub(crate) fn clean_failed(error: &str) -> String {
    format!("❌ Xatolik: {error}")
}

pub(crate) fn submission_accepted(score: &ScoreRecord) -> String {
    format!(
        "✅ Javoblaringiz qabul qilindi!\n\n📊 Natija:\n✅ {} ta to‘g‘ri\n❌ {} ta noto‘g‘ri\n📈 {}%\n🏅 {}",
        score.correct,
        score.wrong,
        format_percent(score.percent),
        score.grade
    )
}

pub(crate) fn recent_results(results: &[QuizResult]) -> String {
    let mut text = String::from("📈 So‘nggi natijalar:\n");
    for result in results {
        text.push_str(&format!(
            "\n🧮 Test ID: {}\n✅ {} ta to‘g‘ri\n❌ {} ta noto‘g‘ri\n📊 {}%\n🏅 {}\n🕓 {}\n",
            result.test_id,
            result.correct_count,
            result.wrong_count,
            format_percent(result.percent),
            result.grade,
            crate::core::time::format_display(result.timestamp),
        ));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::grading::Grade;

    #[test]
    fn submission_reply_lists_score_and_grade() {
        let score = ScoreRecord { correct: 3, wrong: 1, percent: 75.0, grade: Grade::Good };
        let text = submission_accepted(&score);
        assert!(text.contains("3 ta to‘g‘ri"));
        assert!(text.contains("1 ta noto‘g‘ri"));
        assert!(text.contains("75.0%"));
        assert!(text.contains("4 (Yaxshi)"));
    }

    #[test]
    fn broadcast_summary_mentions_failures_only_when_present() {
        assert!(!broadcast_summary(3, 0).contains("bo‘lmadi"));
        assert!(broadcast_summary(3, 1).contains("1 tasiga"));
    }
}
