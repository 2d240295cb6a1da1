//! Flattens a [`Record`] into the single weighted text blob that gets vectorized.

use crate::tokenizer::normalize_fragment;
use crate::Record;

const TITLE_WEIGHT: usize = 2;
const GENRE_WEIGHT: usize = 3;
const DIRECTOR_WEIGHT: usize = 2;

/// The normalized form of the `Unknown` sentinel, dropped from the cast block only.
const UNKNOWN_TOKEN: &str = "unknown";

pub fn build_soup(record: &Record) -> String {
    let title = normalize_fragment(&record.title);
    let genres = join_normalized(&record.genres, |_| true);
    let director = normalize_fragment(&record.director);
    let cast = join_normalized(&record.cast, |member| member != UNKNOWN_TOKEN);
    let country = join_normalized(&record.country, |_| true);
    let rating = normalize_fragment(&record.rating);
    let description = normalize_fragment(&record.description);

    let mut blocks: Vec<&str> = Vec::new();
    repeat_into(&mut blocks, &title, TITLE_WEIGHT);
    repeat_into(&mut blocks, &genres, GENRE_WEIGHT);
    repeat_into(&mut blocks, &director, DIRECTOR_WEIGHT);
    repeat_into(&mut blocks, &cast, 1);
    repeat_into(&mut blocks, &country, 1);
    repeat_into(&mut blocks, &rating, 1);
    repeat_into(&mut blocks, &description, 1);
    blocks.join(" ")
}

fn join_normalized(items: &[String], keep: impl Fn(&str) -> bool) -> String {
    items
        .iter()
        .map(|item| normalize_fragment(item))
        .filter(|item| !item.is_empty() && keep(item))
        .collect::<Vec<_>>()
        .join(" ")
}

fn repeat_into<'a>(blocks: &mut Vec<&'a str>, block: &'a str, times: usize) {
    if block.is_empty() { return; }
    blocks.extend(std::iter::repeat(block).take(times));
}
