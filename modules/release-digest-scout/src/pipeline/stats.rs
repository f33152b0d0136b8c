use super::filter::Rejection;

/// Stats from one aggregation run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub topics_attempted: u32,
    pub topics_failed: u32,
    pub items_fetched: u32,
    pub items_malformed: u32,
    pub candidates: u32,
    pub duplicates_discarded: u32,
    pub duplicates_replaced: u32,
    pub rejected_unknown_date: u32,
    pub rejected_too_old: u32,
    pub rejected_item_count: u32,
    pub rejected_description: u32,
    pub eligible: u32,
    pub selected: u32,
    pub fallback_used: bool,
}

impl RunStats {
    pub(crate) fn record_rejection(&mut self, rejection: Rejection) {
        match rejection {
            Rejection::UnknownDate => self.rejected_unknown_date += 1,
            Rejection::TooOld { .. } => self.rejected_too_old += 1,
            Rejection::ItemCountUnobserved | Rejection::TooFewItems { .. } => {
                self.rejected_item_count += 1
            }
            Rejection::DescriptionUnobserved | Rejection::DescriptionTooShort { .. } => {
                self.rejected_description += 1
            }
        }
    }

    pub fn rejected(&self) -> u32 {
        self.rejected_unknown_date
            + self.rejected_too_old
            + self.rejected_item_count
            + self.rejected_description
    }
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Digest Run Complete ===")?;
        writeln!(f, "Topics attempted:   {}", self.topics_attempted)?;
        writeln!(f, "Topics failed:      {}", self.topics_failed)?;
        writeln!(f, "Items fetched:      {}", self.items_fetched)?;
        writeln!(f, "Items malformed:    {}", self.items_malformed)?;
        writeln!(f, "Unique candidates:  {}", self.candidates)?;
        writeln!(f, "Duplicates dropped: {}", self.duplicates_discarded)?;
        if self.duplicates_replaced > 0 {
            writeln!(f, "Duplicates replaced:{}", self.duplicates_replaced)?;
        }
        if self.rejected() > 0 {
            writeln!(f, "\nRejected:")?;
            writeln!(f, "  Unknown date:  {}", self.rejected_unknown_date)?;
            writeln!(f, "  Too old:       {}", self.rejected_too_old)?;
            writeln!(f, "  Item count:    {}", self.rejected_item_count)?;
            writeln!(f, "  Description:   {}", self.rejected_description)?;
        }
        writeln!(f, "\nEligible:           {}", self.eligible)?;
        writeln!(f, "Selected:           {}", self.selected)?;
        if self.fallback_used {
            writeln!(f, "Digest:             fallback (nothing eligible)")?;
        }
        Ok(())
    }
}
