use crate::types::GeneratedSong;
use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::info;

const FILE_SUFFIX: &str = "_lyrics.txt";

pub fn render_lyrics(song: &GeneratedSong) -> String {
    let mut out = format!("{}\n\n", song.title);
    for section in &song.sections {
        out.push_str(&format!("[{}] ({})\n{}\n\n", section.kind, section.duration, section.lyrics));
    }
    out
}

pub fn lyrics_file_name(title: &str) -> String {
    let cleaned: String = title
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect();
    let stem = if cleaned.trim_matches('_').is_empty() { "song".to_string() } else { cleaned };
    format!("{stem}{FILE_SUFFIX}")
}

pub fn export_lyrics(song: &GeneratedSong, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create export dir {}", dir.display()))?;
    let path = dir.join(lyrics_file_name(&song.title));
    fs::write(&path, render_lyrics(song))
        .with_context(|| format!("failed to write lyrics to {}", path.display()))?;
    info!(path = %path.display(), "lyrics exported");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Arrangement, SongSection};

    fn song(title: &str) -> GeneratedSong {
        GeneratedSong {
            title: title.into(),
            sections: vec![
                SongSection {
                    kind: "সূচনা".into(),
                    duration: "২০ সেকেন্ড".into(),
                    lyrics: "মেঘ জমেছে".into(),
                },
                SongSection {
                    kind: "স্থায়ী".into(),
                    duration: "৪৫ সেকেন্ড".into(),
                    lyrics: "বৃষ্টি নামে\nমন ভেজে".into(),
                },
            ],
            arrangement: Arrangement {
                instruments: "বাঁশি".into(),
                beat_pattern: "কাহারবা".into(),
                bpm: "90".into(),
                vocal_style: "কোমল".into(),
                energy_progression: "ধীরে বাড়ে".into(),
            },
        }
    }

    #[test]
    fn renders_title_and_bracketed_sections() {
        let text = render_lyrics(&song("বর্ষা"));
        assert_eq!(
            text,
            "বর্ষা\n\n[সূচনা] (২০ সেকেন্ড)\nমেঘ জমেছে\n\n[স্থায়ী] (৪৫ সেকেন্ড)\nবৃষ্টি নামে\nমন ভেজে\n\n"
        );
    }

    #[test]
    fn file_name_uses_title_and_suffix() {
        assert_eq!(lyrics_file_name("বর্ষা"), "বর্ষা_lyrics.txt");
        assert_eq!(lyrics_file_name("রাত/দিন: গান"), "রাত_দিন__গান_lyrics.txt");
        assert_eq!(lyrics_file_name("  "), "song_lyrics.txt");
        assert_eq!(lyrics_file_name("//"), "song_lyrics.txt");
    }

    #[test]
    fn writes_file_into_export_dir() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested");
        let path = export_lyrics(&song("বর্ষা"), &target).unwrap();
        assert_eq!(path, target.join("বর্ষা_lyrics.txt"));
        let written = fs::read_to_string(path).unwrap();
        assert!(written.starts_with("বর্ষা\n\n[সূচনা]"));
    }
}
