use kaizen_types::BotResult;

use crate::keyboards;
use crate::messenger::Chat;
use crate::state::Bot;

const GROUP_HELP: &str = "🎌 Kaizen Bot - Group Commands\n\n\
    For everyone:\n\
    • /today - See who checked in today\n\
    • /leaderboard - Group rankings\n\
    • /join - Join this group's accountability circle\n\n\
    Personal (use in a private chat with me):\n\
    • /start - Set up your daily tasks\n\
    • /checkin - Daily check-in\n\
    • /view - Your progress calendar\n\
    • /stats - Your detailed statistics\n\
    • /quote - Daily Japanese wisdom\n\n\
    💡 Check in privately and I'll post your progress here for everyone to see!";

const PRIVATE_HELP: &str = "🎌 Kaizen Bot - Your Accountability Partner\n\n\
    📌 Core:\n\
    • /start - Begin your journey\n\
    • /checkin - Daily check-in\n\
    • /view - Calendar & 14-day streak\n\
    • /stats - Rank card and task rates\n\
    • /report - Weekly progress report\n\
    • /addtask, /removetask - Manage tasks (max 5)\n\
    • /groups, /join <code> - Accountability groups\n\
    • /buddy - Find an accountability buddy\n\n\
    🤖 AI:\n\
    • Voice messages - Talk to me\n\
    • /ask - Chat with the AI assistant\n\
    • /dr - Research with sources\n\
    • /insights - AI habit insights\n\n\
    ⏰ Reminders:\n\
    • /remind - Daily check-in time\n\
    • /remindme 30m stretch - One-off reminder\n\
    • /timezone - Your local time\n\
    • /freeze - Protect your streak (1 per week)\n\n\
    ⚙️ Automation:\n\
    • /automate - Research, scraping, calendar\n\
    • /scrape <url> - Extract a web page\n\
    • /calendar - Google Calendar\n\
    • /ratelimits - Your remaining usage\n\
    • /cancel - Stop the current flow\n\n\
    改善 (Kaizen) = Continuous Improvement";

impl Bot {
    pub(crate) async fn help(&self, chat: &Chat) -> BotResult<()> {
        if chat.is_private() {
            self.say_with(chat.id, PRIVATE_HELP, keyboards::main_menu()).await
        } else {
            self.say(chat.id, GROUP_HELP).await
        }
    }

    pub(crate) async fn menu(&self, chat: &Chat) -> BotResult<()> {
        self.say_with(chat.id, "Choose an option:", keyboards::main_menu())
            .await
    }
}
