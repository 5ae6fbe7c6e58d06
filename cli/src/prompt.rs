use crate::types::SongRequest;
use once_cell::sync::Lazy;
use serde_json::{json, Value};

pub const SYSTEM_INSTRUCTION: &str = "\
আপনি একজন পেশাদার বাঙালি গীতিকার এবং সুরকার।
আপনার কাজ হলো ব্যবহারকারীর দেওয়া তথ্যের ভিত্তিতে একটি সম্পূর্ণ মৌলিক বাংলা গান তৈরি করা।
যদি ব্যবহারকারী কোনো অডিও স্যাম্পল প্রদান করেন, তবে সেই স্যাম্পলের ছন্দ, গতি এবং মুড বিশ্লেষণ করে \
গানের কথা এবং সুরের পরিকল্পনা করুন।

কঠোর নির্দেশাবলী:
১. ভাষা: শুধুমাত্র বাংলা। কোনো ইংরেজি বা হিন্দি শব্দ ব্যবহার করবেন না। \
(এমনকি 'Intro', 'Chorus' এর বদলে 'সূচনা', 'স্থায়ী' ব্যবহার করুন)।
২. সময়কাল: কমপক্ষে ৩ মিনিট এবং সর্বোচ্চ ১০ মিনিট। প্রতি বিভাগের পাশে সময় উল্লেখ করুন।
৩. গঠন: [সূচনা], [স্তবক ১], [স্থায়ী], [স্তবক ২], [স্থায়ী], [সেতু (যদি ৬ মিনিটের বেশি হয়)], [শেষ স্থায়ী]।
৪. ছন্দ এবং গীতিময়তা বজায় রাখুন।
৫. আউটপুট অবশ্যই JSON ফরম্যাটে হতে হবে।";

const CUSTOM_LYRICS_DIRECTIVE: &str = "\
ব্যবহারকারী নিজের লেখা গানের কথা নিচে দিয়েছেন। নতুন কথা লিখবেন না এবং শব্দ বদলাবেন না। \
দেওয়া কথাগুলোকে বিভাগে ভাগ করুন, প্রতিটি বিভাগের নাম ও সময়কাল দিন এবং সেই অনুযায়ী সংগীত আয়োজন করুন।";

/// Schema the generation endpoint must conform to.
pub static SONG_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING" },
            "sections": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "type": {
                            "type": "STRING",
                            "description": "বিভাগের নাম (যেমন: সূচনা, স্তবক, স্থায়ী)"
                        },
                        "duration": {
                            "type": "STRING",
                            "description": "সময়কাল (যেমন: ৩০ সেকেন্ড)"
                        },
                        "lyrics": { "type": "STRING" }
                    },
                    "required": ["type", "duration", "lyrics"]
                }
            },
            "arrangement": {
                "type": "OBJECT",
                "properties": {
                    "instruments": { "type": "STRING" },
                    "beatPattern": { "type": "STRING" },
                    "bpm": { "type": "STRING" },
                    "vocalStyle": { "type": "STRING" },
                    "energyProgression": { "type": "STRING" }
                },
                "required": ["instruments", "beatPattern", "bpm", "vocalStyle", "energyProgression"]
            }
        },
        "required": ["title", "sections", "arrangement"]
    })
});

pub fn render_user_prompt(request: &SongRequest) -> String {
    let style = request.style_notes.trim();
    let mut lines = vec![
        format!("ধারা (Genre): {}", request.genre),
        format!("আবেগ (Mood): {}", request.mood),
        format!("গতি (Tempo): {}", request.tempo.label()),
        format!("ব্যবহারকারীর বর্ণনা: {}", if style.is_empty() { "নেই" } else { style }),
        format!("কাঙ্ক্ষিত সময়কাল: {} মিনিট", request.target_duration),
    ];
    if let Some(voice) = request.voice {
        lines.push(format!("Vocal guide voice: {voice}"));
    }
    if request.audio_sample.is_some() {
        lines.push("সংযুক্ত অডিও স্যাম্পলটির ওপর ভিত্তি করে গানটি তৈরি করুন।".to_string());
    }
    if let Some(lyrics) = request.custom_lyrics.as_deref() {
        lines.push(String::new());
        lines.push(CUSTOM_LYRICS_DIRECTIVE.to_string());
        lines.push(String::new());
        lines.push(lyrics.trim().to_string());
    }
    lines.join("\n")
}

pub fn render_vocal_instruction(text: &str) -> String {
    format!(
        "Sing the following Bengali lyrics as a vocal guide, with a melodic and rhythmic \
         delivery that follows the song's phrasing:\n\n{text}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AudioSample, Tempo, Voice};

    fn request() -> SongRequest {
        SongRequest {
            genre: "Folk".into(),
            mood: "Joyful".into(),
            tempo: Tempo::Medium,
            style_notes: "  ".into(),
            target_duration: 4,
            custom_lyrics: None,
            voice: None,
            audio_sample: None,
        }
    }

    #[test]
    fn user_prompt_lists_form_fields() {
        let prompt = render_user_prompt(&request());
        assert!(prompt.contains("Folk"));
        assert!(prompt.contains("Joyful"));
        assert!(prompt.contains("মাঝারি (Medium)"));
        assert!(prompt.contains("4 মিনিট"));
        assert!(prompt.contains("নেই"));
        assert!(!prompt.contains("অডিও স্যাম্পল"));
        assert!(!prompt.contains("নতুন কথা লিখবেন না"));
    }

    #[test]
    fn user_prompt_mentions_sample_voice_and_custom_lyrics() {
        let mut req = request();
        req.audio_sample = Some(AudioSample {
            data: "AAAA".into(),
            mime_type: "audio/mpeg".into(),
            file_name: "hum.mp3".into(),
            path: "hum.mp3".into(),
        });
        req.voice = Some(Voice::Puck);
        req.custom_lyrics = Some("\nআমার সোনার বাংলা\n".into());
        let prompt = render_user_prompt(&req);
        assert!(prompt.contains("অডিও স্যাম্পল"));
        assert!(prompt.contains("Puck"));
        assert!(prompt.contains("নতুন কথা লিখবেন না"));
        assert!(prompt.ends_with("আমার সোনার বাংলা"));
    }

    #[test]
    fn schema_requires_every_field() {
        assert_eq!(SONG_SCHEMA["required"], json!(["title", "sections", "arrangement"]));
        assert_eq!(
            SONG_SCHEMA["properties"]["sections"]["items"]["required"],
            json!(["type", "duration", "lyrics"])
        );
        let arrangement = SONG_SCHEMA["properties"]["arrangement"]["required"].as_array().unwrap();
        assert_eq!(arrangement.len(), 5);
    }

    #[test]
    fn vocal_instruction_wraps_text() {
        let instruction = render_vocal_instruction("স্থায়ী\nএসো হে");
        assert!(instruction.starts_with("Sing"));
        assert!(instruction.ends_with("স্থায়ী\nএসো হে"));
    }
}
