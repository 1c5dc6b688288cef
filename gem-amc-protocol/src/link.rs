use std::fmt::Display;
use std::ops::Index;

/// Number of optohybrid links served by one AMC.
pub const NUM_LINKS: usize = 12;

/// One of the optohybrid links `0..12`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Link(u8);

impl Link {
    /// Returns the link with the given index, or `None` if the index is out of range.
    pub const fn new(index: u8) -> Option<Link> {
        if (index as usize) < NUM_LINKS {
            Some(Link(index))
        } else {
            None
        }
    }

    pub const fn index(&self) -> usize {
        self.0 as usize
    }

    /// All links in ascending order.
    pub fn all() -> impl Iterator<Item = Link> {
        (0..NUM_LINKS as u8).map(Link)
    }
}

impl Display for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OH{}", self.0)
    }
}

/// Selects the links that take part in an SCA transaction.
///
/// Bit `i` enables link `i`. Only the lower 12 bits are meaningful,
/// higher bits are ignored.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct LinkMask(u16);

impl LinkMask {
    /// Every link enabled.
    pub const ALL: LinkMask = LinkMask(0x0fff);
    /// No link enabled.
    pub const NONE: LinkMask = LinkMask(0);

    const VALID_BITS: u16 = 0x0fff;

    pub const fn new(bits: u16) -> LinkMask {
        LinkMask(bits)
    }

    /// The mask as given, including ignored high bits.
    pub const fn raw(&self) -> u16 {
        self.0
    }

    /// The mask restricted to existing links.
    pub const fn bits(&self) -> u16 {
        self.0 & Self::VALID_BITS
    }

    pub const fn contains(&self, link: Link) -> bool {
        (self.0 >> link.0) & 0x1 == 0x1
    }

    /// Enabled links in ascending order.
    pub fn links(self) -> impl Iterator<Item = Link> {
        Link::all().filter(move |link| self.contains(*link))
    }
}

impl Default for LinkMask {
    fn default() -> Self {
        LinkMask::ALL
    }
}

impl From<u16> for LinkMask {
    fn from(value: u16) -> Self {
        LinkMask(value)
    }
}

impl Display for LinkMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:03x}", self.bits())
    }
}

/// Reply of an SCA transaction, one word per link slot.
///
/// Slots of links that were masked out hold `0`. A genuine zero reading
/// cannot be told apart from a missing reply; use the mask of the
/// transaction to know which slots carry data.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ScaReply {
    data: [u32; NUM_LINKS],
}

impl ScaReply {
    pub const fn new(data: [u32; NUM_LINKS]) -> ScaReply {
        ScaReply { data }
    }

    pub fn get(&self, link: Link) -> u32 {
        self.data[link.index()]
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.data
    }

    /// Pairs of link and value for the links enabled in `mask`.
    pub fn iter_masked(&self, mask: LinkMask) -> impl Iterator<Item = (Link, u32)> + '_ {
        mask.links().map(move |link| (link, self.get(link)))
    }
}

impl Index<Link> for ScaReply {
    type Output = u32;

    fn index(&self, link: Link) -> &u32 {
        &self.data[link.index()]
    }
}

impl From<ScaReply> for Vec<u32> {
    fn from(value: ScaReply) -> Self {
        value.data.to_vec()
    }
}
