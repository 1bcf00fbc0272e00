use crate::domain::{MailFolder, MessageHeader};
use crate::infrastructure::{MailProvider, ProviderError};
use futures::stream::{self, Stream, TryStreamExt};
use std::pin::pin;
use std::sync::Arc;
use tracing::debug;

/// Children of `folder`: the eagerly populated array when present, otherwise fetched.
pub async fn children_of<M>(
    mail: &M,
    account_id: &str,
    folder: &MailFolder,
) -> Result<Vec<MailFolder>, ProviderError>
where
    M: MailProvider + ?Sized,
{
    match &folder.subfolders {
        Some(children) => Ok(children.clone()),
        None => mail.folder_children(account_id, folder).await,
    }
}

/// Lazy depth-first (pre-order) walk over every folder below `root`, excluding `root`.
pub fn walk_folders<'a, M>(
    mail: &'a M,
    account_id: &'a str,
    root: MailFolder,
) -> impl Stream<Item = Result<MailFolder, ProviderError>> + Send + 'a
where
    M: MailProvider + ?Sized,
{
    stream::try_unfold(
        (Some(root), Vec::<MailFolder>::new()),
        move |(root, mut pending)| async move {
            if let Some(root) = root {
                let mut top = children_of(mail, account_id, &root).await?;
                top.reverse();
                pending = top;
            }
            let Some(folder) = pending.pop() else {
                return Ok(None);
            };
            let mut children = children_of(mail, account_id, &folder).await?;
            children.reverse();
            pending.extend(children);
            Ok::<_, ProviderError>(Some((folder, (None, pending))))
        },
    )
}

enum Cursor {
    Start,
    Next(String),
    Done,
}

/// Lazy sequence of per-page byte totals for one folder, following continuation tokens.
pub fn page_sizes<'a, M>(
    mail: &'a M,
    account_id: &'a str,
    folder: &'a MailFolder,
) -> impl Stream<Item = Result<u64, ProviderError>> + Send + 'a
where
    M: MailProvider + ?Sized,
{
    stream::try_unfold(Cursor::Start, move |cursor| async move {
        let token = match cursor {
            Cursor::Start => None,
            Cursor::Next(token) => Some(token),
            Cursor::Done => return Ok(None),
        };
        let page = mail
            .list_messages(account_id, folder, token.as_deref())
            .await?;
        let bytes = page
            .messages
            .iter()
            .map(MessageHeader::size_bytes)
            .fold(0u64, u64::saturating_add);
        let next = match page.continuation {
            Some(token) => Cursor::Next(token),
            None => Cursor::Done,
        };
        Ok::<_, ProviderError>(Some((bytes, next)))
    })
}

/// Sums message sizes across an account's whole folder tree.
pub struct UsageAggregator<M>
where
    M: MailProvider,
{
    mail: Arc<M>,
}

impl<M> UsageAggregator<M>
where
    M: MailProvider,
{
    pub fn new(mail: Arc<M>) -> Self {
        Self { mail }
    }

    pub async fn account_usage(&self, account_id: &str) -> Result<u64, ProviderError> {
        let mail = self.mail.as_ref();
        let account = mail.get_account(account_id).await?;
        // The account itself acts as the root; an empty id addresses it on the host.
        let root = MailFolder {
            id: String::new(),
            name: account.name,
            subfolders: account.folders,
        };

        let mut total = 0u64;
        let mut folder_count = 0usize;
        let mut folders = pin!(walk_folders(mail, account_id, root));
        while let Some(folder) = folders.try_next().await? {
            let mut pages = pin!(page_sizes(mail, account_id, &folder));
            while let Some(bytes) = pages.try_next().await? {
                total = total.saturating_add(bytes);
            }
            folder_count += 1;
        }

        debug!(account_id = %account_id, folders = folder_count, bytes = total, "Computed account usage");
        Ok(total)
    }
}
