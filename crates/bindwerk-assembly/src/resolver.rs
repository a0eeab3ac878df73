// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Range/modifier resolution: expand a declared page range under a parity
// modifier into the ordered sequence of concrete page numbers.

use bindwerk_core::{PageModifier, PageRange};

/// Expand `range` under `modifier`, ascending.
///
/// The iterator is lazy and restartable: the same inputs always produce the
/// same sequence, and an empty result (e.g. `Even` over a single odd page) is
/// valid — it simply contributes no pages.
pub fn resolve(range: PageRange, modifier: PageModifier) -> impl Iterator<Item = u32> {
    (range.first()..=range.last()).filter(move |page| modifier.keeps(*page))
}
