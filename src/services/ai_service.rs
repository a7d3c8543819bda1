use anyhow::Result;

use crate::models::EncodedImage;

/// A vision-language model that answers a text prompt about one inline image.
/// Implementations must be safe to share across concurrent requests.
#[async_trait::async_trait]
pub trait VisionModel: Send + Sync {
    /// Returns the model's raw text answer, untouched.
    async fn generate(&self, prompt: &str, image: &EncodedImage) -> Result<String>;

    fn name(&self) -> &str;
}

/// Instructional prompt sent with every image. The summary language is the
/// only variable part.
pub fn analysis_prompt(language: &str) -> String {
    format!(
        "Kamu adalah ahli gizi. Analisis foto makanan ini dan jawab dalam format JSON dengan tiga kolom:\n\
         \n\
         1. freshness: tingkat kesegaran makanan dalam persen (bilangan bulat 0-100)\n\
         2. calories: perkiraan total kalori dalam kcal (bilangan bulat)\n\
         3. summary: ringkasan gizi 2-3 kalimat dalam {language}\n\
         \n\
         Gunakan warna dan tekstur untuk menilai kesegaran; jenis makanan, porsi dan bahan untuk kalori; \
         sebutkan kandungan utama (karbohidrat, protein, lemak, vitamin) di ringkasan.\n\
         \n\
         Contoh jawaban:\n\
         {{\"freshness\": 85, \"calories\": 320, \"summary\": \"Nasi goreng dengan sayuran dan telur. Tinggi karbohidrat, protein sedang.\"}}\n\
         \n\
         PENTING: jawab HANYA dengan satu objek JSON yang valid. Jangan tambahkan penjelasan, teks lain, atau blok markdown.",
        language = language
    )
}
