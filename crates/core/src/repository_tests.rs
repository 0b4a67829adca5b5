// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn display_name_strips_dot_git_and_takes_last_two_segments() {
    assert_eq!(
        display_name_from_uri("https://github.com/acme/widgets.git"),
        "acme/widgets"
    );
}

#[test]
fn display_name_handles_trailing_slash_free_uris() {
    assert_eq!(display_name_from_uri("file:///fixtures/echo-repo"), "fixtures/echo-repo");
}

#[test]
fn display_name_falls_back_for_short_paths() {
    assert_eq!(display_name_from_uri("widgets"), "widgets");
}
